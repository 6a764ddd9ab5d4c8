// Refund Scheduler - drives refund cycles and offset reports
//
// Two independent loops:
// - refund loop: one `RefundOrchestrator::run` per tick of the refund schedule
// - report loop: logs cursor offsets on its own, usually slower, schedule
//
// Schedule expressions:
// - "every 5m" / "every 90s" / "every 1h"
// - "hourly"
// - "daily@02" (once a day at 02:00 UTC)

use chrono::{DateTime, TimeZone, Utc};
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;

use crate::error::AppError;
use crate::refund::orchestrator::RefundOrchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundSchedule {
    Every(Duration),
    Hourly,
    /// UTC hour to execute (0-23)
    Daily(u32),
}

impl FromStr for RefundSchedule {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_lowercase();
        let invalid = || AppError::Config(format!("Invalid schedule expression: {:?}", value));

        if value == "hourly" {
            return Ok(RefundSchedule::Hourly);
        }

        if let Some(hour) = value.strip_prefix("daily@") {
            let hour: u32 = hour.parse().map_err(|_| invalid())?;
            if hour > 23 {
                return Err(invalid());
            }
            return Ok(RefundSchedule::Daily(hour));
        }

        if let Some(period) = value.strip_prefix("every ") {
            let period = period.trim();
            let (split, _) = period.char_indices().last().ok_or_else(invalid)?;
            let (amount, unit) = period.split_at(split);
            let amount: u64 = amount.trim().parse().map_err(|_| invalid())?;
            let multiplier = match unit {
                "s" => 1,
                "m" => 60,
                "h" => 3600,
                _ => return Err(invalid()),
            };
            let seconds = amount.checked_mul(multiplier).ok_or_else(invalid)?;
            if seconds == 0 {
                return Err(invalid());
            }
            return Ok(RefundSchedule::Every(Duration::from_secs(seconds)));
        }

        Err(invalid())
    }
}

impl RefundSchedule {
    /// Fixed tick period, `None` for wall-clock schedules
    fn period(&self) -> Option<Duration> {
        match self {
            RefundSchedule::Every(period) => Some(*period),
            RefundSchedule::Hourly => Some(Duration::from_secs(3600)),
            RefundSchedule::Daily(_) => None,
        }
    }

    /// Wait until the next tick
    async fn wait(&self, ticker: &mut Option<tokio::time::Interval>) {
        match (self, ticker) {
            (_, Some(ticker)) => {
                ticker.tick().await;
            }
            (RefundSchedule::Daily(hour), None) => {
                let now = Utc::now();
                let next = calculate_next_daily_execution(now, *hour);
                let wait = next.signed_duration_since(now);
                info!("⏰ Next refund cycle scheduled for: {} UTC", next.format("%H:%M:%S"));
                if let Ok(wait) = wait.to_std() {
                    tokio::time::sleep(wait).await;
                }
            }
            (_, None) => {}
        }
    }

    fn ticker(&self) -> Option<tokio::time::Interval> {
        self.period().map(|period| {
            let mut ticker = interval(period);
            // a long cycle must not trigger a burst of catch-up runs
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        })
    }
}

/// Calculate next daily execution time
fn calculate_next_daily_execution(now: DateTime<Utc>, execution_hour: u32) -> DateTime<Utc> {
    let today = now
        .date_naive()
        .and_hms_opt(execution_hour, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive));

    match today {
        Some(next) if next > now => next,
        // execution time has passed today (or the hour is invalid): schedule for tomorrow
        _ => {
            let tomorrow = now.date_naive() + chrono::Duration::days(1);
            tomorrow
                .and_hms_opt(execution_hour.min(23), 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive))
                .unwrap_or(now + chrono::Duration::days(1))
        }
    }
}

pub struct RefundScheduler {
    refund_schedule: RefundSchedule,
    report_schedule: RefundSchedule,
    orchestrator: Arc<RefundOrchestrator>,
}

impl RefundScheduler {
    pub fn new(
        refund_schedule: RefundSchedule,
        report_schedule: RefundSchedule,
        orchestrator: Arc<RefundOrchestrator>,
    ) -> Self {
        Self {
            refund_schedule,
            report_schedule,
            orchestrator,
        }
    }

    /// Start both loops in the background
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        vec![self.start_refund_loop(), self.start_report_loop()]
    }

    fn start_refund_loop(&self) -> JoinHandle<()> {
        let schedule = self.refund_schedule;
        let orchestrator = self.orchestrator.clone();

        tokio::spawn(async move {
            let mut ticker = schedule.ticker();
            loop {
                schedule.wait(&mut ticker).await;

                // Cycles run on their own task so a slow cycle never delays the
                // schedule; the orchestrator skips the overlapping run.
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    info!("🔄 Starting refund cycle");
                    orchestrator.run().await;
                });
            }
        })
    }

    fn start_report_loop(&self) -> JoinHandle<()> {
        let schedule = self.report_schedule;
        let orchestrator = self.orchestrator.clone();

        tokio::spawn(async move {
            let mut ticker = schedule.ticker();
            loop {
                schedule.wait(&mut ticker).await;
                orchestrator.report_offsets();
            }
        })
    }
}
