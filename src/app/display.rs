use crate::api::types::{
    CalendarDay, CalendarItem, CollectionType, Paged, Subject, UserCollection,
};

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

fn score_text(score: Option<f64>) -> String {
    match score {
        Some(score) if score > 0.0 => format!("{score:.1}"),
        _ => "N/A".to_string(),
    }
}

fn rank_text(rank: Option<u32>) -> String {
    match rank {
        Some(rank) if rank > 0 => rank.to_string(),
        _ => "N/A".to_string(),
    }
}

pub(crate) fn print_collections(status: CollectionType, collections: &[UserCollection]) {
    if collections.is_empty() {
        println!("No anime in your {status} list.");
        return;
    }

    println!("{:<10} {:<9} {:<7} {:<50}", "ID", "PROGRESS", "RATE", "NAME");
    for item in collections {
        let progress = format!("{}/{}", item.ep_status, item.subject.eps);
        let rate = if item.rate == 0 {
            "-".to_string()
        } else {
            item.rate.to_string()
        };
        println!(
            "{:<10} {:<9} {:<7} {:<50}",
            item.subject_id,
            progress,
            rate,
            truncate(item.subject.display_name(), 50)
        );
    }
    println!("\n{} {status} subject(s)", collections.len());
}

pub(crate) fn print_search(title: &str, page: &Paged<Subject>, page_no: u32) {
    println!("{title}");
    if page.data.is_empty() {
        println!("No results.");
        return;
    }

    println!(
        "{:<10} {:<44} {:<12} {:<6} {:<6}",
        "ID", "NAME", "DATE", "SCORE", "RANK"
    );
    for subject in &page.data {
        let score = subject
            .score
            .or_else(|| subject.rating.as_ref().map(|rating| rating.score));
        let rank = subject
            .rank
            .or_else(|| subject.rating.as_ref().map(|rating| rating.rank));
        println!(
            "{:<10} {:<44} {:<12} {:<6} {:<6}",
            subject.id,
            truncate(subject.display_name(), 44),
            subject.date.as_deref().unwrap_or("-"),
            score_text(score),
            rank_text(rank)
        );
    }
    println!("\npage {page_no}, {} result(s) in total", page.total);
}

/// `today` is the bgm.tv weekday id (1 = Monday).
pub(crate) fn print_calendar(days: &[CalendarDay], today: u8) {
    for day in days {
        let marker = if day.weekday.id == today {
            "  <- today"
        } else {
            ""
        };
        println!("{} {}{marker}", day.weekday.cn, day.weekday.en);
        if day.items.is_empty() {
            println!("  (nothing airing)");
        }
        for item in &day.items {
            println!("  {}", calendar_line(item));
        }
        println!();
    }
}

pub(crate) fn calendar_line(item: &CalendarItem) -> String {
    let score = item.rating.as_ref().map(|rating| rating.score);
    let voters = item.rating.as_ref().map_or(0, |rating| rating.total);
    let watching = item.collection.as_ref().map_or(0, |stats| stats.doing);
    format!(
        "{:<9} {:<36} {:<11} score {:<4} rank {:<5} voters {:<6} watching {}",
        item.id,
        truncate(item.display_name(), 36),
        if item.air_date.is_empty() {
            "-"
        } else {
            item.air_date.as_str()
        },
        score_text(score),
        rank_text(item.rank),
        voters,
        watching
    )
}

pub(crate) fn subject_panel(subject: &Subject) -> String {
    let rating = subject.rating.clone().unwrap_or_default();
    let watching = subject.collection.as_ref().map_or(0, |stats| stats.doing);
    let tags = subject
        .tags
        .iter()
        .map(|tag| tag.name.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let mut panel = format!(
        "ID: {}\n{}\n{} Episodes: {} Viewers: {}\nScore: {} Rank: {} Voters: {}\nTags:\n{}",
        subject.id,
        subject.display_name(),
        subject.date.as_deref().unwrap_or("-"),
        subject.eps,
        watching,
        score_text(subject.score.or(Some(rating.score))),
        rank_text(subject.rank.or(Some(rating.rank))),
        rating.total,
        if tags.is_empty() { "-" } else { tags.as_str() },
    );
    if !subject.summary.trim().is_empty() {
        panel.push_str("\n\n");
        panel.push_str(subject.summary.trim());
    }
    panel
}
