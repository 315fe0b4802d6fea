use clap::Subcommand;
use serde_json::json;

use crate::cli::context::Context;
use crate::cli::utils::{output_json, output_success, prompt_value};
use crate::cli::OutputFormat;
use crate::error::ApiError;
use crate::guard::{self, GuardDecision};
use crate::rides::Confirm;
use crate::types::{Credentials, PasswordChange, ProfileUpdate, Registration};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Sign in with your work email")]
    Login {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Create an account")]
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        employee_id: Option<String>,
        #[arg(long)]
        department: Option<String>,
    },

    #[command(about = "Sign out and forget the stored session")]
    Logout,

    #[command(about = "Show the signed-in user")]
    Whoami,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Update profile fields")]
    UpdateProfile {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        department: Option<String>,
    },

    #[command(about = "Change your password")]
    ChangePassword {
        #[arg(long, help = "Current password (will prompt if not provided)")]
        current: Option<String>,
        #[arg(long = "new", help = "New password (will prompt if not provided)")]
        new_password: Option<String>,
    },

    #[command(about = "Delete your account permanently")]
    DeleteAccount,
}

const DELETE_ACCOUNT_PROMPT: &str = "Are you sure you want to delete your account? This action cannot be undone.";

pub async fn handle(cmd: AuthCommands, ctx: &Context) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email, password } => {
            require_signed_out(ctx)?;
            let password = prompt_value("Password", password)?;
            let user = ctx.session.login(&Credentials { email, password }).await?;
            output_success(
                &ctx.output,
                &format!("Signed in as {} ({})", user.email, user.role.as_str()),
                Some(json!({ "user": user, "home": user.role.home() })),
            )
        }
        AuthCommands::Register {
            first_name,
            last_name,
            email,
            password,
            phone,
            employee_id,
            department,
        } => {
            require_signed_out(ctx)?;
            let password = prompt_value("Password", password)?;
            let registration = Registration {
                first_name,
                last_name,
                email,
                password,
                phone,
                employee_id,
                department,
            };
            let user = ctx.session.register(&registration).await?;
            output_success(&ctx.output, &format!("Registered {}", user.email), Some(json!({ "user": user })))
        }
        AuthCommands::Logout => {
            ctx.session.logout().await;
            if ctx.output == OutputFormat::Json {
                output_success(&ctx.output, "Logged out successfully", None)?;
            }
            Ok(())
        }
        AuthCommands::Whoami => {
            ctx.require("/profile")?;
            let user = ctx
                .session
                .user()
                .ok_or_else(|| ApiError::validation("You are not signed in"))?;
            match ctx.output {
                OutputFormat::Json => output_json(&user),
                OutputFormat::Text => {
                    println!("{} <{}>", user.full_name(), user.email);
                    println!("Role: {}", user.role.as_str());
                    if let Some(department) = &user.department {
                        println!("Department: {}", department);
                    }
                    if let Some(employee_id) = &user.employee_id {
                        println!("Employee ID: {}", employee_id);
                    }
                    Ok(())
                }
            }
        }
        AuthCommands::Status => {
            let session = ctx.session.snapshot();
            let home = session.role().map(|r| r.home());
            match ctx.output {
                OutputFormat::Json => output_json(&json!({
                    "status": session.status,
                    "user": session.user,
                    "home": home,
                    "api": ctx.config.api.base_url,
                })),
                OutputFormat::Text => {
                    match &session.user {
                        Some(user) if session.is_authenticated() => {
                            println!("Signed in as {} ({})", user.email, user.role.as_str());
                        }
                        _ => println!("Not signed in"),
                    }
                    println!("API: {}", ctx.config.api.base_url);
                    Ok(())
                }
            }
        }
        AuthCommands::UpdateProfile {
            first_name,
            last_name,
            phone,
            department,
        } => {
            ctx.require("/profile")?;
            let update = ProfileUpdate {
                first_name,
                last_name,
                phone,
                department,
            };
            let user = ctx.session.update_profile(&update).await?;
            if ctx.output == OutputFormat::Json {
                output_json(&user)?;
            }
            Ok(())
        }
        AuthCommands::ChangePassword { current, new_password } => {
            ctx.require("/profile")?;
            let change = PasswordChange {
                current_password: prompt_value("Current password", current)?,
                new_password: prompt_value("New password", new_password)?,
            };
            ctx.session.change_password(&change).await?;
            if ctx.output == OutputFormat::Json {
                output_success(&ctx.output, "Password changed successfully", None)?;
            }
            Ok(())
        }
        AuthCommands::DeleteAccount => {
            ctx.require("/profile")?;
            if !ctx.confirm.confirm(DELETE_ACCOUNT_PROMPT) {
                return output_success(&ctx.output, "Account kept", None);
            }
            ctx.session.delete_account().await?;
            if ctx.output == OutputFormat::Json {
                output_success(&ctx.output, "Account deleted successfully", None)?;
            }
            Ok(())
        }
    }
}

fn require_signed_out(ctx: &Context) -> Result<(), ApiError> {
    match guard::check(&ctx.session.snapshot(), "/login") {
        GuardDecision::Redirect(_) => {
            let email = ctx.session.user().map(|u| u.email).unwrap_or_default();
            Err(ApiError::validation(format!(
                "Already signed in as {}. Run `rapido auth logout` first.",
                email
            )))
        }
        _ => Ok(()),
    }
}
