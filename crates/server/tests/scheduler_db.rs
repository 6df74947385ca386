//! Notification scheduler end to end against a real PostgreSQL database.
//!
//! # Running
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p server --test scheduler_db
//! ```
//!
//! Tests are skipped if DATABASE_URL is not set. Emails are captured by an
//! in-memory mailer; other rows already in the database may also receive mail,
//! so assertions only look at this test's inbox. Tests run serially because
//! each scheduler claims every recipient due in the same minute.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use serial_test::serial;
use sqlx::PgPool;
use uuid::Uuid;

use server::{
    db::{
        self,
        deliveries::DeliveryKind,
        entries::{CreateEntryData, EntryRepository},
        families::FamilyRepository,
        notification_settings::{NotificationSettingsRepository, UpdateNotificationSettings},
        users::{CreateUserData, User, UserRepository},
    },
    mail::{EmailMessage, MailError, Mailer},
    mood::Mood,
    scheduler::{NotificationScheduler, SchedulerConfig, reminder_key},
};

fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

macro_rules! skip_without_db {
    () => {
        if database_url().is_none() {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        }
    };
}

async fn create_pool() -> PgPool {
    let url = database_url().expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to database");
    db::migrate(&pool).await.expect("Failed to run migrations");
    pool
}

async fn create_test_user(pool: &PgPool) -> User {
    let family = FamilyRepository::create_with(pool, "Scheduler family")
        .await
        .expect("Failed to create family");
    UserRepository::create_with(
        pool,
        CreateUserData {
            family_id: family.id,
            email: format!("parent-{}@example.com", Uuid::new_v4()),
            display_name: "Jordan".to_string(),
            password_hash: "unused".to_string(),
        },
    )
    .await
    .expect("Failed to create user")
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    fn sent_to(&self, to_email: &str) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.to_email == to_email)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

fn eastern() -> FixedOffset {
    FixedOffset::west_opt(5 * 3600).unwrap()
}

#[tokio::test]
#[serial]
async fn test_scheduled_pass_sends_each_kind_once_per_period() {
    skip_without_db!();
    let pool = create_pool().await;
    let user = create_test_user(&pool).await;
    let inbox = format!("inbox-{}@example.com", Uuid::new_v4());

    EntryRepository::new(&pool)
        .create(
            user.family_id,
            user.id,
            CreateEntryData {
                title: None,
                content: "Quiet morning, long walk after lunch".to_string(),
                mood: Some(Mood::Calm),
                child_id: None,
                check_in: None,
            },
        )
        .await
        .unwrap();

    let now = Utc::now();
    NotificationSettingsRepository::new(&pool)
        .upsert(
            user.id,
            UpdateNotificationSettings {
                daily_reminder: true,
                reminder_time: reminder_key(now, eastern()),
                weekly_progress: true,
                notification_email: Some(inbox.clone()),
                browser_notifications: false,
            },
        )
        .await
        .unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    let handle = NotificationScheduler::spawn(
        pool.clone(),
        mailer.clone(),
        SchedulerConfig {
            enabled: true,
            utc_offset: eastern(),
            app_base_url: "https://app.example.com".to_string(),
        },
    );
    assert!(handle.is_enabled());

    handle.run_at(DeliveryKind::DailyReminder, now).await;
    handle.run_at(DeliveryKind::WeeklyProgress, now).await;
    // the same period again finds every slot claimed
    assert_eq!(handle.run_at(DeliveryKind::DailyReminder, now).await, 0);
    assert_eq!(handle.run_at(DeliveryKind::WeeklyProgress, now).await, 0);
    handle.shutdown().await;

    let received = mailer.sent_to(&inbox);
    let daily: Vec<_> = received
        .iter()
        .filter(|m| m.subject == "Your daily journal reminder")
        .collect();
    let weekly: Vec<_> = received
        .iter()
        .filter(|m| m.subject == "Your weekly parenting journey")
        .collect();

    assert_eq!(daily.len(), 1);
    assert_eq!(weekly.len(), 1);
    assert_eq!(received.len(), 2);
    assert!(daily[0].text.contains("https://app.example.com/journal/new"));
    assert!(weekly[0].text.contains("Current streak: 1 day\n"));
    assert!(weekly[0].text.contains("Most frequent mood: calm"));
}

#[tokio::test]
#[serial]
async fn test_disabled_reminder_gets_no_email() {
    skip_without_db!();
    let pool = create_pool().await;
    let user = create_test_user(&pool).await;
    let inbox = format!("inbox-{}@example.com", Uuid::new_v4());
    let now = Utc::now();

    NotificationSettingsRepository::new(&pool)
        .upsert(
            user.id,
            UpdateNotificationSettings {
                daily_reminder: false,
                reminder_time: reminder_key(now, eastern()),
                weekly_progress: false,
                notification_email: Some(inbox.clone()),
                browser_notifications: false,
            },
        )
        .await
        .unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    let handle = NotificationScheduler::spawn(
        pool.clone(),
        mailer.clone(),
        SchedulerConfig {
            enabled: true,
            utc_offset: eastern(),
            app_base_url: "https://app.example.com".to_string(),
        },
    );

    handle.run_at(DeliveryKind::DailyReminder, now).await;
    handle.run_at(DeliveryKind::WeeklyProgress, now).await;
    handle.shutdown().await;

    assert!(mailer.sent_to(&inbox).is_empty());
}
