mod api;
mod app;
mod config;
mod db;
mod jobs;
mod logging;
mod metrics;
mod models;
mod profile;
mod theme;
mod tui;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use api::{HttpTransport, JobSearch};
use app::AppContext;
use config::Config;
use db::Database;
use tui::truncate;
use models::{ApplicationStatus, RemotePreference, SkillCategory, UserProfile, parse_list};

#[derive(Parser)]
#[command(name = "lume")]
#[command(about = "Job search tracker - browse jobs, apply, and follow your applications")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or edit your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// List jobs
    Jobs {
        /// Free-text search
        #[arg(short, long)]
        query: Option<String>,

        /// Location filter
        #[arg(short, long)]
        location: Option<String>,

        /// Only remote (true) or only on-site (false) jobs
        #[arg(short, long)]
        remote: Option<bool>,
    },

    /// Show job details
    Show {
        /// Job ID
        job_id: String,
    },

    /// Apply to a job from the current listing
    Apply {
        /// Job ID
        job_id: String,
    },

    /// List your applications
    Applications,

    /// Change an application's status
    Status {
        /// Application ID
        application_id: String,

        /// New status (applied, interviewing, offered, accepted, rejected)
        status: ApplicationStatus,
    },

    /// Weekly goal, response rate and status breakdown
    Dashboard,

    /// Light/dark preference
    Theme {
        #[command(subcommand)]
        command: ThemeCommands,
    },

    /// Interactive browser
    Browse,
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show the profile
    Show,

    /// Update profile fields (the whole profile is saved)
    Set {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Years of experience (half years allowed)
        #[arg(long)]
        experience: Option<f64>,

        /// Weekly application goal
        #[arg(long)]
        goal: Option<u32>,

        /// Preferred roles (comma-separated)
        #[arg(long)]
        roles: Option<String>,

        /// Preferred locations (comma-separated)
        #[arg(long)]
        locations: Option<String>,

        /// Preferred industries (comma-separated)
        #[arg(long)]
        industries: Option<String>,

        /// remote, hybrid or onsite
        #[arg(long)]
        remote: Option<RemotePreference>,
    },

    /// Manage skills
    Skill {
        #[command(subcommand)]
        command: SkillCommands,
    },
}

#[derive(Subcommand)]
enum SkillCommands {
    /// Add a skill to a category
    Add {
        /// programming_languages, frameworks_and_tools, certifications, technologies
        category: SkillCategory,
        skill: String,
    },

    /// Remove a skill from a category
    Remove {
        category: SkillCategory,
        skill: String,
    },
}

#[derive(Subcommand)]
enum ThemeCommands {
    /// Show the current mode
    Show,

    /// Switch between light and dark
    Toggle,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Browse) {
        logging::init_file(&Database::data_dir().join("lume.log"), cli.config.verbose)?;
    } else {
        logging::init_stderr(cli.config.verbose)?;
    }

    let db = Database::open()?;
    let transport = Arc::new(HttpTransport::new(&cli.config.api_url, cli.config.timeout())?);
    let mut ctx = AppContext::new(transport, &cli.config.user_id, &db, theme::ambient_mode())?;

    if let Commands::Theme { command } = &cli.command {
        // theme is local only; no need to reach the server
        match command {
            ThemeCommands::Show => println!("Theme: {} ({})", ctx.theme.mode(), db.path().display()),
            ThemeCommands::Toggle => {
                let mode = ctx.theme.toggle_theme()?;
                println!("Theme switched to {}.", mode);
            }
        }
        return Ok(());
    }

    let search = match &cli.command {
        Commands::Jobs {
            query,
            location,
            remote,
        } => Some(JobSearch {
            query: query.clone(),
            location: location.clone(),
            remote: *remote,
        }),
        _ => None,
    };
    ctx.initialize(search.as_ref()).await;

    match cli.command {
        Commands::Profile { command } => run_profile(&ctx, command).await?,

        Commands::Jobs { .. } => {
            let jobs = ctx.jobs.jobs();
            if let Some(err) = ctx.jobs.jobs_error() {
                if jobs.is_empty() {
                    return Err(anyhow!(err));
                }
                eprintln!("Warning: {}", err);
            }
            if let Some(err) = ctx.jobs.applications_error() {
                eprintln!("Warning: {} (applied markers may be missing)", err);
            }

            if jobs.is_empty() {
                println!("No jobs found.");
            } else {
                println!("{:<3} {:<14} {:<30} {:<20} {:<16}", "", "ID", "TITLE", "COMPANY", "LOCATION");
                println!("{}", "-".repeat(86));
                for job in jobs {
                    let marker = if ctx.jobs.is_applied(&job.job_id) { "+" } else { "" };
                    println!(
                        "{:<3} {:<14} {:<30} {:<20} {:<16}",
                        marker,
                        truncate(&job.job_id, 12),
                        truncate(&job.title, 28),
                        truncate(&job.company, 18),
                        truncate(&job.location, 16)
                    );
                }
            }
        }

        Commands::Show { job_id } => match ctx.jobs.job(&job_id) {
            Some(job) => {
                println!("Job {}", job.job_id);
                println!("Title: {}", job.title);
                println!("Company: {}", job.company);
                println!("Location: {}", job.location);
                println!("URL: {}", job.url);
                if !job.source.is_empty() {
                    println!("Source: {}", job.source);
                }
                if let Some(salary) = &job.salary_range {
                    println!("Salary: {} {} - {}", salary.currency, salary.min, salary.max);
                }
                if let Some(posted) = &job.posted_date {
                    println!("Posted: {}", posted);
                }
                if let Some(remote) = job.is_remote {
                    println!("Remote: {}", if remote { "yes" } else { "no" });
                }
                if let Some(level) = &job.experience_level {
                    println!("Level: {}", level);
                }
                if let Some(kind) = &job.job_type {
                    println!("Type: {}", kind);
                }
                if ctx.jobs.is_applied(&job.job_id) {
                    println!("Applied: yes");
                }
                if let Some(requirements) = &job.requirements {
                    println!("\n--- Requirements ---");
                    for requirement in requirements {
                        println!("  - {}", requirement);
                    }
                }
                if let Some(description) = &job.description {
                    println!("\n--- Description ---\n{}", textwrap::fill(description, 80));
                }
            }
            None => {
                println!("Job {} not found.", job_id);
            }
        },

        Commands::Apply { job_id } => {
            ctx.jobs.apply_to_job(&job_id).await?;
            println!("Applied to {}.", job_id);
        }

        Commands::Applications => {
            if let Some(err) = ctx.jobs.applications_error() {
                eprintln!("Warning: {}", err);
            }
            let applications = ctx.jobs.applications();
            if applications.is_empty() {
                println!("No applications yet.");
            } else {
                println!("{:<14} {:<13} {:<28} {:<18} {:<12}", "ID", "STATUS", "TITLE", "COMPANY", "APPLIED");
                println!("{}", "-".repeat(88));
                for app in &applications {
                    // applications for jobs that are no longer listed are hidden
                    let Some(job) = ctx.jobs.job_for(app) else { continue };
                    println!(
                        "{:<14} {:<13} {:<28} {:<18} {:<12}",
                        truncate(&app.id, 12),
                        app.status,
                        truncate(&job.title, 26),
                        truncate(&job.company, 16),
                        truncate(&app.applied_date, 10)
                    );
                }
            }
        }

        Commands::Status {
            application_id,
            status,
        } => {
            ctx.jobs.update_application(&application_id, status).await?;
            println!("Application {} is now {}.", application_id, status);
        }

        Commands::Dashboard => {
            if let Some(err) = ctx.jobs.applications_error() {
                eprintln!("Warning: {}", err);
            }
            let dashboard = ctx.dashboard();
            println!(
                "This week: {} of {} applications ({}%)",
                dashboard.stats.this_week, dashboard.goal, dashboard.progress
            );
            println!("Total applications: {}", dashboard.stats.total);
            println!("Response rate: {}%", dashboard.response_rate);
            let stats = &dashboard.stats;
            println!(
                "Pipeline: {} waiting, {} interviewing, {} offered, {} accepted, {} rejected",
                stats.pending, stats.interviewing, stats.offered, stats.accepted, stats.rejected
            );
            println!("\n{:<13} {:>6} {:>6}", "STATUS", "COUNT", "SHARE");
            println!("{}", "-".repeat(27));
            for share in &dashboard.distribution {
                println!("{:<13} {:>6} {:>5}%", share.status, share.count, share.percent);
            }
        }

        Commands::Browse => tui::run_browse(&mut ctx).await?,

        Commands::Theme { .. } => {}
    }

    Ok(())
}

async fn run_profile(ctx: &AppContext<'_>, command: ProfileCommands) -> Result<()> {
    let current = match ctx.profile.profile() {
        Some(profile) => profile,
        None => {
            let reason = ctx.profile.error().unwrap_or_else(|| "no profile returned".to_string());
            return Err(anyhow!("Profile not found: {}", reason));
        }
    };

    let updated = match command {
        ProfileCommands::Show => {
            print_profile(&current);
            return Ok(());
        }

        ProfileCommands::Set {
            name,
            email,
            experience,
            goal,
            roles,
            locations,
            industries,
            remote,
        } => {
            let mut updated = current.clone();
            if let Some(name) = name {
                updated.name = name;
            }
            if let Some(email) = email {
                updated.email = email;
            }
            if let Some(years) = experience {
                updated.experience_years = half_years(years)?;
            }
            if let Some(goal) = goal {
                if goal == 0 {
                    return Err(anyhow!("Weekly goal must be at least 1"));
                }
                updated.weekly_application_goal = goal;
            }
            if let Some(roles) = roles {
                updated.preferred_roles = parse_list(&roles);
            }
            if let Some(locations) = locations {
                updated.preferred_locations = parse_list(&locations);
            }
            if let Some(industries) = industries {
                updated.preferred_industries = parse_list(&industries);
            }
            if let Some(remote) = remote {
                updated.remote_preference = remote;
            }
            updated
        }

        ProfileCommands::Skill { command } => match command {
            SkillCommands::Add { category, skill } => current.with_skill_added(category, &skill),
            SkillCommands::Remove { category, skill } => current.with_skill_removed(category, &skill),
        },
    };

    if updated == current {
        println!("Nothing to change.");
        return Ok(());
    }

    ctx.profile.update_profile(&updated).await?;
    println!("Profile saved.");
    if let Some(saved) = ctx.profile.profile() {
        print_profile(&saved);
    }
    Ok(())
}

fn print_profile(profile: &UserProfile) {
    println!("{} <{}>", profile.name, profile.email);
    println!("User: {}", profile.user_id);
    println!("Experience: {} years", profile.experience_years);
    println!("Weekly goal: {} applications", profile.weekly_application_goal);
    println!("Work style: {}", profile.remote_preference);
    println!("Roles: {}", profile.preferred_roles.join(", "));
    println!("Locations: {}", profile.preferred_locations.join(", "));
    println!("Industries: {}", profile.preferred_industries.join(", "));
    println!("\n--- Skills ---");
    for category in SkillCategory::ALL {
        let skills = profile.skills.get(category);
        if !skills.is_empty() {
            println!("{}: {}", category.label(), skills.join(", "));
        }
    }
}

/// Rounds to the nearest half year; rejects negative and non-finite input.
fn half_years(years: f64) -> Result<f64> {
    if !years.is_finite() || years < 0.0 {
        return Err(anyhow!("Experience must be a non-negative number of years"));
    }
    Ok((years * 2.0).round() / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_years_rounds() {
        assert_eq!(half_years(3.4).unwrap(), 3.5);
        assert_eq!(half_years(2.2).unwrap(), 2.0);
        assert_eq!(half_years(0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_half_years_rejects_invalid() {
        assert!(half_years(-1.0).is_err());
        assert!(half_years(f64::NAN).is_err());
        assert!(half_years(f64::INFINITY).is_err());
    }
}
