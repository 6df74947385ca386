//! Static text and HTML bodies for outgoing email.

use crate::analytics::WeeklyProgress;

use super::EmailMessage;

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn wrap_html(heading: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><body style=\"font-family:sans-serif;color:#333\">\
         <h2>{heading}</h2>{body}\
         <p style=\"color:#888;font-size:12px\">You can change notification preferences in the app settings.</p>\
         </body></html>"
    )
}

fn greeting(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        "Hi there".to_string()
    } else {
        format!("Hi {name}")
    }
}

pub fn daily_reminder(to_email: &str, to_name: &str, app_base_url: &str) -> EmailMessage {
    let link = format!("{}/journal/new", app_base_url.trim_end_matches('/'));
    let greeting = greeting(to_name);

    let text = format!(
        "{greeting},\n\n\
         This is your daily reminder to take a few minutes for your parenting journal.\n\
         Even one sentence about today counts.\n\n\
         Write today's entry: {link}\n"
    );
    let html = wrap_html(
        "Time for today's reflection",
        &format!(
            "<p>{}</p>\
             <p>This is your daily reminder to take a few minutes for your parenting journal. \
             Even one sentence about today counts.</p>\
             <p><a href=\"{link}\">Write today's entry</a></p>",
            escape_html(&greeting)
        ),
    );

    EmailMessage {
        to_email: to_email.to_string(),
        to_name: Some(to_name.to_string()),
        subject: "Your daily journal reminder".to_string(),
        text,
        html,
    }
}

pub fn weekly_progress(
    to_email: &str,
    to_name: &str,
    progress: &WeeklyProgress,
    app_base_url: &str,
) -> EmailMessage {
    let link = format!("{}/insights", app_base_url.trim_end_matches('/'));
    let greeting = greeting(to_name);
    let top_mood = progress
        .top_mood
        .map(|m| m.to_string())
        .unwrap_or_else(|| "not recorded".to_string());
    let days = if progress.streak_days == 1 { "day" } else { "days" };

    let text = format!(
        "{greeting},\n\n\
         Here is your week in ParentJourney:\n\
         - Entries this week: {}\n\
         - Current streak: {} {days}\n\
         - Most frequent mood: {top_mood}\n\n\
         See your insights: {link}\n",
        progress.entries_this_week, progress.streak_days
    );
    let html = wrap_html(
        "Your weekly progress",
        &format!(
            "<p>{}</p>\
             <ul>\
             <li>Entries this week: <strong>{}</strong></li>\
             <li>Current streak: <strong>{} {days}</strong></li>\
             <li>Most frequent mood: <strong>{top_mood}</strong></li>\
             </ul>\
             <p><a href=\"{link}\">See your insights</a></p>",
            escape_html(&greeting),
            progress.entries_this_week,
            progress.streak_days
        ),
    );

    EmailMessage {
        to_email: to_email.to_string(),
        to_name: Some(to_name.to_string()),
        subject: "Your weekly parenting journey".to_string(),
        text,
        html,
    }
}

pub fn test_message(to_email: &str, to_name: &str) -> EmailMessage {
    let greeting = greeting(to_name);
    EmailMessage {
        to_email: to_email.to_string(),
        to_name: Some(to_name.to_string()),
        subject: "ParentJourney test notification".to_string(),
        text: format!("{greeting},\n\nNotifications are set up correctly.\n"),
        html: wrap_html(
            "Test notification",
            &format!(
                "<p>{}</p><p>Notifications are set up correctly.</p>",
                escape_html(&greeting)
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::Mood;

    #[test]
    fn test_daily_reminder_links_to_app() {
        let message = daily_reminder("sam@example.com", "Sam", "https://app.example.com/");
        assert_eq!(message.to_email, "sam@example.com");
        assert!(message.text.starts_with("Hi Sam,"));
        assert!(message.text.contains("https://app.example.com/journal/new"));
        assert!(message.html.contains("href=\"https://app.example.com/journal/new\""));
    }

    #[test]
    fn test_weekly_progress_renders_stats() {
        let progress = WeeklyProgress {
            entries_this_week: 4,
            streak_days: 1,
            top_mood: Some(Mood::Grateful),
        };
        let message = weekly_progress("sam@example.com", "Sam", &progress, "https://app.example.com");
        assert!(message.text.contains("Entries this week: 4"));
        assert!(message.text.contains("Current streak: 1 day\n"));
        assert!(message.text.contains("Most frequent mood: grateful"));
        assert!(message.html.contains("<strong>4</strong>"));
    }

    #[test]
    fn test_weekly_progress_without_mood() {
        let progress = WeeklyProgress {
            entries_this_week: 0,
            streak_days: 0,
            top_mood: None,
        };
        let message = weekly_progress("sam@example.com", "", &progress, "https://app.example.com");
        assert!(message.text.starts_with("Hi there,"));
        assert!(message.text.contains("not recorded"));
        assert!(message.text.contains("0 days"));
    }

    #[test]
    fn test_names_are_escaped_in_html() {
        let message = test_message("x@example.com", "<b>Max</b>");
        assert!(message.html.contains("Hi &lt;b&gt;Max&lt;/b&gt;"));
        assert!(!message.html.contains("<b>Max"));
    }
}
