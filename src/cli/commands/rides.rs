use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::time::MissedTickBehavior;

use crate::cli::context::Context;
use crate::cli::utils::{format_ride_line, output_json, output_rides, output_success};
use crate::cli::OutputFormat;
use crate::error::ApiError;
use crate::filter::{QueryPipeline, RideFilter};
use crate::rides::{MutationOutcome, NewRide, RideController, RideList, RideListView, RideScope, RideStatus, RidesApi};
use crate::session::SessionStatus;

#[derive(Subcommand)]
pub enum RideCommands {
    #[command(about = "List your rides")]
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    #[command(about = "Show one ride")]
    Show {
        #[arg(help = "Ride ID")]
        id: String,
        #[arg(long, help = "Keep refreshing until interrupted")]
        watch: bool,
    },

    #[command(about = "Book a ride")]
    Book {
        #[arg(long, help = "Pickup location")]
        pickup: String,
        #[arg(long, help = "Drop location")]
        drop: String,
        #[arg(long, help = "Pickup time, RFC 3339 (e.g. 2026-10-20T09:00:00Z)")]
        at: DateTime<Utc>,
        #[arg(long, help = "Estimated fare")]
        fare: Option<Decimal>,
    },

    #[command(about = "Cancel a ride")]
    Cancel {
        #[arg(help = "Ride ID")]
        id: String,
        #[arg(long, help = "Reason shown to approvers")]
        reason: Option<String>,
    },

    #[command(about = "Permanently delete a cancelled ride")]
    Delete {
        #[arg(help = "Ride ID")]
        id: String,
    },
}

/// Listing filters shared by the user and admin ride lists
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long, help = "Only rides in this status")]
    pub status: Option<RideStatus>,
    #[arg(long, help = "Only rides from this department")]
    pub department: Option<String>,
    #[arg(long, help = "Scheduled on or after (YYYY-MM-DD)")]
    pub from: Option<NaiveDate>,
    #[arg(long, help = "Scheduled on or before (YYYY-MM-DD)")]
    pub to: Option<NaiveDate>,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long, help = "Keep refreshing until interrupted")]
    pub watch: bool,
}

impl FilterArgs {
    fn to_filter(&self, default_limit: u32) -> RideFilter {
        RideFilter {
            status: self.status,
            department: self.department.clone(),
            start_date: self.from,
            end_date: self.to,
            page: self.page,
            limit: self.limit.unwrap_or(default_limit),
        }
    }
}

pub async fn handle(cmd: RideCommands, ctx: &Context) -> anyhow::Result<()> {
    match cmd {
        RideCommands::List { filter } => {
            ctx.require("/rides")?;
            list_rides(ctx, RideScope::Own, &filter).await
        }
        RideCommands::Show { id, watch } => {
            ctx.require(&format!("/rides/{}", id))?;
            if watch {
                return every(ctx.config.query.fast_refetch_interval(), || show_ride(ctx, &id)).await;
            }
            show_ride(ctx, &id).await
        }
        RideCommands::Book { pickup, drop, at, fare } => {
            ctx.require("/rides/book")?;
            if at <= Utc::now() {
                return Err(ApiError::validation("Schedule time must be in the future").into());
            }
            let ride = NewRide {
                pickup,
                drop,
                schedule_time: at,
                estimated_fare: fare,
            };
            let ride = RidesApi::new(ctx.session.gateway().clone()).create(&ride).await?;
            output_success(
                &ctx.output,
                &format!("Ride {} booked and awaiting approval", ride.id),
                Some(json!({ "ride": ride })),
            )
        }
        RideCommands::Cancel { id, reason } => {
            ctx.require(&format!("/rides/{}", id))?;
            let controller = tracked_controller(ctx, RideScope::Own, &id).await?;
            let outcome = match reason {
                Some(reason) => controller.cancel_with_reason(&id, &reason).await?,
                None => controller.cancel(&id).await?,
            };
            report_outcome(ctx, outcome, "Ride cancelled successfully")
        }
        RideCommands::Delete { id } => {
            ctx.require(&format!("/rides/{}", id))?;
            let controller = tracked_controller(ctx, RideScope::Own, &id).await?;
            let outcome = controller.delete_permanently(&id).await?;
            report_outcome(ctx, outcome, "Ride deleted permanently")
        }
    }
}

async fn show_ride(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let ride = RidesApi::new(ctx.session.gateway().clone()).get(id).await?;
    match ctx.output {
        OutputFormat::Json => output_json(&ride),
        OutputFormat::Text => {
            println!("{}", format_ride_line(&ride));
            if let Some(created) = ride.created_at {
                println!("Booked:    {}", created.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
            }
            for (label, at) in [
                ("Approved:", ride.approved_at),
                ("Rejected:", ride.rejected_at),
                ("Cancelled:", ride.cancelled_at),
            ] {
                if let Some(at) = at {
                    println!("{:<10} {}", label, at.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
                }
            }
            Ok(())
        }
    }
}

/// Run `tick` now and then on every interval until Ctrl-C or a failure
pub(crate) async fn every<F, Fut>(interval: Duration, mut tick: F) -> anyhow::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = ticker.tick() => tick().await?,
        }
    }
}

pub(crate) async fn list_rides(ctx: &Context, scope: RideScope, args: &FilterArgs) -> anyhow::Result<()> {
    let filter = args.to_filter(ctx.config.query.page_size);
    if args.watch {
        return watch_rides(ctx, scope, filter).await;
    }

    let pipeline = QueryPipeline::new(filter, &ctx.config.query)?;
    let snapshot = pipeline
        .current()
        .ok_or_else(|| anyhow::anyhow!("Filter produced no query"))?;

    let list = RideList::new(ctx.session.gateway().clone(), scope);
    list.load(snapshot).await?;
    output_rides(&ctx.output, &list.rides(), pagination_value(&list)?)
}

async fn watch_rides(ctx: &Context, scope: RideScope, filter: RideFilter) -> anyhow::Result<()> {
    let mut view = RideListView::open(
        ctx.session.gateway().clone(),
        scope,
        filter,
        &ctx.config.query,
        ctx.notifier.clone(),
        ctx.confirm.clone(),
    )?;
    view.start_polling(ctx.config.query.refetch_interval());

    let mut changes = view.changes();
    let mut session = ctx.session.subscribe();

    // The first page may have landed before we subscribed
    let loaded = *changes.borrow_and_update() > 0;
    if loaded {
        output_rides(&ctx.output, &view.rides(), pagination_value(view.list())?)?;
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let _ = changes.borrow_and_update();
                if ctx.output == OutputFormat::Text {
                    println!("-- {} --", Local::now().format("%H:%M:%S"));
                }
                output_rides(&ctx.output, &view.rides(), pagination_value(view.list())?)?;
            }
            changed = session.changed() => {
                if changed.is_err() || *session.borrow_and_update() == SessionStatus::Unauthenticated {
                    return Err(ApiError::session_expired().into());
                }
            }
        }
    }
    Ok(())
}

/// Controller with the target ride fetched, so local status checks apply
pub(crate) async fn tracked_controller(ctx: &Context, scope: RideScope, id: &str) -> anyhow::Result<RideController> {
    let gateway = ctx.session.gateway().clone();
    let list = RideList::new(gateway.clone(), scope);
    let ride = RidesApi::new(gateway.clone()).get(id).await?;
    list.upsert(ride);
    Ok(RideController::new(gateway, list, ctx.notifier.clone(), ctx.confirm.clone()))
}

pub(crate) fn report_outcome(ctx: &Context, outcome: MutationOutcome, done: &str) -> anyhow::Result<()> {
    match outcome {
        // Text mode already printed the notification
        MutationOutcome::Completed if ctx.output == OutputFormat::Json => output_success(&ctx.output, done, None),
        MutationOutcome::Completed => Ok(()),
        MutationOutcome::Declined => output_success(&ctx.output, "Nothing changed", None),
        MutationOutcome::Busy => Err(ApiError::validation("Another change to this ride is in progress").into()),
        MutationOutcome::Aborted => Err(ApiError::session_expired().into()),
    }
}

fn pagination_value(list: &RideList) -> anyhow::Result<Option<Value>> {
    Ok(list.pagination().map(serde_json::to_value).transpose()?)
}
