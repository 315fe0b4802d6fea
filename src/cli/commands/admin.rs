use chrono::{Local, NaiveDate};
use clap::Subcommand;
use serde_json::json;

use rust_decimal::Decimal;

use super::rides::{every, list_rides, report_outcome, tracked_controller, FilterArgs};
use crate::admin::{AdminApi, NewUser, UserPatch, UserQuery, DEFAULT_ACTIVITY_LIMIT};
use crate::cli::context::Context;
use crate::cli::utils::{output_empty_collection, output_json, output_success, prompt_value};
use crate::cli::OutputFormat;
use crate::rides::{Confirm, RideScope};
use crate::types::{Registration, Role};

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "List every ride")]
    Rides {
        #[command(flatten)]
        filter: FilterArgs,
    },

    #[command(about = "Approve a pending ride")]
    Approve {
        #[arg(help = "Ride ID")]
        id: String,
        #[arg(long)]
        comments: Option<String>,
    },

    #[command(about = "Reject a pending ride")]
    Reject {
        #[arg(help = "Ride ID")]
        id: String,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        comments: Option<String>,
    },

    #[command(about = "Ride and fare analytics")]
    Analytics {
        #[arg(long, help = "From date (YYYY-MM-DD)")]
        from: Option<NaiveDate>,
        #[arg(long, help = "To date (YYYY-MM-DD)")]
        to: Option<NaiveDate>,
        #[arg(long, help = "Keep refreshing until interrupted")]
        watch: bool,
    },

    #[command(about = "Recent activity feed")]
    Activity {
        #[arg(long, default_value_t = DEFAULT_ACTIVITY_LIMIT)]
        limit: u32,
    },

    #[command(about = "User management")]
    Users {
        #[command(subcommand)]
        cmd: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List users")]
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },

    #[command(about = "Create a user")]
    Create {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, help = "Initial password (will prompt if not provided)")]
        password: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        employee_id: Option<String>,
        #[arg(long, help = "Grant the admin role")]
        admin: bool,
    },

    #[command(about = "Update a user")]
    Update {
        #[arg(help = "User ID")]
        id: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },

    #[command(about = "Delete a user")]
    Delete {
        #[arg(help = "User ID")]
        id: String,
    },
}

pub async fn handle(cmd: AdminCommands, ctx: &Context) -> anyhow::Result<()> {
    let api = AdminApi::new(ctx.session.gateway().clone());

    match cmd {
        AdminCommands::Rides { filter } => {
            ctx.require("/admin/rides")?;
            list_rides(ctx, RideScope::All, &filter).await
        }
        AdminCommands::Approve { id, comments } => {
            ctx.require("/admin/rides")?;
            let controller = tracked_controller(ctx, RideScope::All, &id).await?;
            let outcome = controller.approve(&id, comments.as_deref()).await?;
            report_outcome(ctx, outcome, "Ride approved")
        }
        AdminCommands::Reject { id, reason, comments } => {
            ctx.require("/admin/rides")?;
            let controller = tracked_controller(ctx, RideScope::All, &id).await?;
            let outcome = controller.reject(&id, reason.as_deref(), comments.as_deref()).await?;
            report_outcome(ctx, outcome, "Ride rejected")
        }
        AdminCommands::Analytics { from, to, watch } => {
            ctx.require("/admin/analytics")?;
            if watch {
                return every(ctx.config.query.slow_refetch_interval(), || show_analytics(ctx, &api, from, to)).await;
            }
            show_analytics(ctx, &api, from, to).await
        }
        AdminCommands::Activity { limit } => {
            ctx.require("/admin/activity")?;
            let activities = api.recent_activity(limit).await?;
            if activities.is_empty() {
                return output_empty_collection(&ctx.output, "activities", "No recent activity");
            }
            match ctx.output {
                OutputFormat::Json => output_json(&json!({ "activities": activities })),
                OutputFormat::Text => {
                    for activity in &activities {
                        let when = activity.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M");
                        match activity.destination() {
                            Some(to) => println!("{}  {} -> {}", when, activity.description, to),
                            None => println!("{}  {}", when, activity.description),
                        }
                    }
                    Ok(())
                }
            }
        }
        AdminCommands::Users { cmd } => {
            ctx.require("/admin/users")?;
            handle_users(cmd, &api, ctx).await
        }
    }
}

async fn show_analytics(
    ctx: &Context,
    api: &AdminApi,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let analytics = api.analytics(from, to).await?;
    match ctx.output {
        OutputFormat::Json => output_json(&analytics),
        OutputFormat::Text => {
            let s = &analytics.summary;
            println!("Total rides:    {}", s.total_rides);
            println!("Pending:        {}", s.pending_rides);
            println!("Approved:       {} ({}%)", s.approved_rides, s.approval_rate());
            println!("Completed:      {} ({}%)", s.completed_rides, s.completion_rate());
            println!("Rejected:       {}", s.rejected_rides);
            println!("Cancelled:      {}", s.cancelled_rides);
            println!("Users:          {}", s.total_users);
            if let Some(fares) = &analytics.fare_analytics {
                let show = |v: Option<Decimal>| v.map(|d| format!("₹{}", d.round_dp(0))).unwrap_or_else(|| "-".to_string());
                println!(
                    "Fares:          total {}, avg {}, max {}",
                    show(fares.total_fare),
                    show(fares.avg_fare),
                    show(fares.max_fare)
                );
            }
            for dept in &analytics.department_analytics {
                println!("  {:<20} {}", dept.department.as_deref().unwrap_or("(none)"), dept.total_rides);
            }
            for month in &analytics.monthly_analytics {
                println!("  {}  {}", month.label(), month.count);
            }
            Ok(())
        }
    }
}

async fn handle_users(cmd: UserCommands, api: &AdminApi, ctx: &Context) -> anyhow::Result<()> {
    match cmd {
        UserCommands::List {
            search,
            department,
            active,
            page,
            limit,
        } => {
            let query = UserQuery {
                search,
                department,
                is_active: active,
                page,
                limit,
            };
            let page = api.users(&query).await?;
            if page.users.is_empty() {
                return output_empty_collection(&ctx.output, "users", "No users found");
            }
            match ctx.output {
                OutputFormat::Json => output_json(&json!({ "users": page.users, "pagination": page.pagination })),
                OutputFormat::Text => {
                    for user in &page.users {
                        println!(
                            "{:<24}  {:<28}  {:<6}  {:<16}  {}",
                            user.id,
                            user.email,
                            user.role.as_str(),
                            user.department.as_deref().unwrap_or("-"),
                            if user.is_active.unwrap_or(true) { "active" } else { "inactive" }
                        );
                    }
                    Ok(())
                }
            }
        }
        UserCommands::Create {
            first_name,
            last_name,
            email,
            password,
            department,
            phone,
            employee_id,
            admin,
        } => {
            let user = NewUser {
                registration: Registration {
                    first_name,
                    last_name,
                    email,
                    password: prompt_value("Password", password)?,
                    phone,
                    employee_id,
                    department,
                },
                role: if admin { Role::Admin } else { Role::User },
            };
            let created = api.create_user(&user).await?;
            output_success(&ctx.output, &format!("User {} created", created.email), Some(json!({ "user": created })))
        }
        UserCommands::Update {
            id,
            first_name,
            last_name,
            phone,
            department,
            active,
        } => {
            let patch = UserPatch {
                first_name,
                last_name,
                phone,
                department,
                role: None,
                is_active: active,
            };
            let updated = api.update_user(&id, &patch).await?;
            output_success(&ctx.output, &format!("User {} updated", updated.email), Some(json!({ "user": updated })))
        }
        UserCommands::Delete { id } => {
            if !ctx.confirm.confirm("Are you sure you want to delete this user?") {
                return output_success(&ctx.output, "Nothing changed", None);
            }
            api.delete_user(&id).await?;
            output_success(&ctx.output, &format!("User {} deleted", id), None)
        }
    }
}
