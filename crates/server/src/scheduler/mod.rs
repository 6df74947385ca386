//! Background email notifications.
//!
//! A single task wakes once a minute and, in a fixed timezone:
//!
//! - sends the daily reminder to every user whose `reminder_time` equals the
//!   current local "HH:MM";
//! - on Sunday at 09:00 sends the weekly progress summary to users who opted in.
//!
//! Each send is claimed in `notification_deliveries` first so a user gets at
//! most one email per kind and period. Failures are logged and dropped.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Datelike, Duration as ChronoDuration, FixedOffset, Timelike, Utc, Weekday};
use sqlx::PgPool;
use tokio::{
    sync::{mpsc, oneshot},
    time::{self, MissedTickBehavior},
};

use crate::{
    analytics::{self, MAX_STREAK_LOOKBACK_DAYS},
    db::{
        deliveries::{DeliveryKind, DeliveryRepository},
        entries::EntryRepository,
        notification_settings::{NotificationSettingsRepository, ReminderRecipient},
    },
    mail::{EmailMessage, Mailer, templates},
};

const TICK_INTERVAL: Duration = Duration::from_secs(60);

pub const WEEKLY_WEEKDAY: Weekday = Weekday::Sun;
pub const WEEKLY_HOUR: u32 = 9;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub utc_offset: FixedOffset,
    pub app_base_url: String,
}

enum SchedulerCommand {
    /// Run one pass as of `at`, ignoring the weekly slot check. Replies with the sent count.
    Run {
        kind: DeliveryKind,
        at: DateTime<Utc>,
        reply: oneshot::Sender<usize>,
    },
    Shutdown,
}

/// Handle for controlling the notification scheduler.
#[derive(Clone)]
pub struct NotificationSchedulerHandle {
    tx: Option<mpsc::Sender<SchedulerCommand>>,
}

impl NotificationSchedulerHandle {
    /// Run one pass of `kind` immediately and wait for it. Returns the number of emails sent.
    pub async fn run_now(&self, kind: DeliveryKind) -> usize {
        self.run_at(kind, Utc::now()).await
    }

    /// Like [`run_now`](Self::run_now) but with the clock pinned to `at`.
    pub async fn run_at(&self, kind: DeliveryKind, at: DateTime<Utc>) -> usize {
        let Some(ref tx) = self.tx else {
            return 0;
        };
        let (reply, done) = oneshot::channel();
        if tx.send(SchedulerCommand::Run { kind, at, reply }).await.is_err() {
            return 0;
        }
        done.await.unwrap_or(0)
    }

    pub async fn shutdown(&self) {
        if let Some(ref tx) = self.tx {
            let _ = tx.send(SchedulerCommand::Shutdown).await;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }
}

pub struct NotificationScheduler {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
    config: SchedulerConfig,
}

impl NotificationScheduler {
    /// Spawn the scheduler. A disabled config yields a handle with no task behind it.
    pub fn spawn(
        pool: PgPool,
        mailer: Arc<dyn Mailer>,
        config: SchedulerConfig,
    ) -> NotificationSchedulerHandle {
        if !config.enabled {
            tracing::info!("Notification scheduler disabled (PJ_SCHEDULER_ENABLED=false)");
            return NotificationSchedulerHandle { tx: None };
        }

        let (tx, rx) = mpsc::channel(4);
        let scheduler = Self {
            pool,
            mailer,
            config,
        };
        tokio::spawn(scheduler.run(rx));

        NotificationSchedulerHandle { tx: Some(tx) }
    }

    async fn run(self, mut rx: mpsc::Receiver<SchedulerCommand>) {
        let mut interval = time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            utc_offset = %self.config.utc_offset,
            "Notification scheduler started"
        );

        loop {
            tokio::select! {
                Some(cmd) = rx.recv() => {
                    match cmd {
                        SchedulerCommand::Run { kind, at, reply } => {
                            let sent = match kind {
                                DeliveryKind::DailyReminder => self.send_daily_reminders(at).await,
                                DeliveryKind::WeeklyProgress => self.send_weekly_progress(at).await,
                            };
                            let _ = reply.send(sent);
                        }
                        SchedulerCommand::Shutdown => {
                            tracing::info!("Notification scheduler shutting down");
                            break;
                        }
                    }
                }
                _ = interval.tick() => {
                    let now = Utc::now();
                    self.send_daily_reminders(now).await;
                    if is_weekly_slot(now, self.config.utc_offset) {
                        self.send_weekly_progress(now).await;
                    }
                }
            }
        }
    }

    async fn send_daily_reminders(&self, now: DateTime<Utc>) -> usize {
        let offset = self.config.utc_offset;
        let key = reminder_key(now, offset);
        let recipients = match NotificationSettingsRepository::new(&self.pool)
            .select_due_reminders(&key)
            .await
        {
            Ok(recipients) => recipients,
            Err(error) => {
                tracing::error!(?error, reminder_time = %key, "failed to select due reminders");
                return 0;
            }
        };

        if recipients.is_empty() {
            tracing::trace!(reminder_time = %key, "no reminders due");
            return 0;
        }

        let period = daily_period_key(now, offset);
        let mut sent = 0usize;
        for recipient in &recipients {
            if !self
                .claim(recipient, DeliveryKind::DailyReminder, &period)
                .await
            {
                continue;
            }
            let message = templates::daily_reminder(
                recipient.destination(),
                &recipient.display_name,
                &self.config.app_base_url,
            );
            if self.deliver(recipient, &message).await {
                sent += 1;
            }
        }

        tracing::info!(
            reminder_time = %key,
            due = recipients.len(),
            sent,
            "daily reminders processed"
        );
        sent
    }

    async fn send_weekly_progress(&self, now: DateTime<Utc>) -> usize {
        let offset = self.config.utc_offset;
        let recipients = match NotificationSettingsRepository::new(&self.pool)
            .select_weekly_recipients()
            .await
        {
            Ok(recipients) => recipients,
            Err(error) => {
                tracing::error!(?error, "failed to select weekly progress recipients");
                return 0;
            }
        };

        let period = weekly_period_key(now, offset);
        let since = now - ChronoDuration::days(i64::from(MAX_STREAK_LOOKBACK_DAYS));
        let entries = EntryRepository::new(&self.pool);
        let mut sent = 0usize;

        for recipient in &recipients {
            // load before claiming so a failed read leaves the week unclaimed
            let recent = match entries.list_by_author_since(recipient.user_id, since).await {
                Ok(recent) => recent,
                Err(error) => {
                    tracing::error!(?error, user_id = %recipient.user_id, "failed to load entries for weekly progress");
                    continue;
                }
            };
            if !self
                .claim(recipient, DeliveryKind::WeeklyProgress, &period)
                .await
            {
                continue;
            }
            let progress = analytics::weekly_progress(&recent, now, offset);
            let message = templates::weekly_progress(
                recipient.destination(),
                &recipient.display_name,
                &progress,
                &self.config.app_base_url,
            );
            if self.deliver(recipient, &message).await {
                sent += 1;
            }
        }

        tracing::info!(
            period = %period,
            recipients = recipients.len(),
            sent,
            "weekly progress processed"
        );
        sent
    }

    async fn claim(&self, recipient: &ReminderRecipient, kind: DeliveryKind, period: &str) -> bool {
        match DeliveryRepository::new(&self.pool)
            .try_claim(recipient.user_id, kind, period)
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!(user_id = %recipient.user_id, %kind, period, "already sent");
                false
            }
            Err(error) => {
                tracing::error!(?error, user_id = %recipient.user_id, %kind, "failed to claim delivery");
                false
            }
        }
    }

    async fn deliver(&self, recipient: &ReminderRecipient, message: &EmailMessage) -> bool {
        match self.mailer.send(message).await {
            Ok(()) => true,
            Err(error) => {
                tracing::error!(
                    ?error,
                    user_id = %recipient.user_id,
                    subject = %message.subject,
                    "failed to send notification email"
                );
                false
            }
        }
    }
}

/// Local wall-clock "HH:MM" compared against stored reminder times.
pub fn reminder_key(now: DateTime<Utc>, offset: FixedOffset) -> String {
    now.with_timezone(&offset).format("%H:%M").to_string()
}

pub fn is_weekly_slot(now: DateTime<Utc>, offset: FixedOffset) -> bool {
    let local = now.with_timezone(&offset);
    local.weekday() == WEEKLY_WEEKDAY && local.hour() == WEEKLY_HOUR && local.minute() == 0
}

pub fn daily_period_key(now: DateTime<Utc>, offset: FixedOffset) -> String {
    analytics::local_date(now, offset).format("%Y-%m-%d").to_string()
}

pub fn weekly_period_key(now: DateTime<Utc>, offset: FixedOffset) -> String {
    let week = analytics::local_date(now, offset).iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}
