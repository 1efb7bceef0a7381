//! Plain-text rendering of entries, statistics and sharing results.

use passvault_core::utils::{format_date, format_last_used, format_optional, mask_secret, truncate_string};
use passvault_core::{CollaboratorEntry, SecurityStats, ShareOutcome, Strength, UnifiedEntry};

const TITLE_WIDTH: usize = 28;
const USERNAME_WIDTH: usize = 28;
const ID_WIDTH: usize = 24;

pub fn print_entries(entries: &[&UnifiedEntry]) {
    println!(
        "{:<id$}  {:<title$}  {:<user$}  {:<12}  {:<6}  LAST USED",
        "ID",
        "TITLE",
        "USERNAME",
        "CATEGORY",
        "",
        id = ID_WIDTH,
        title = TITLE_WIDTH,
        user = USERNAME_WIDTH,
    );
    for entry in entries {
        let flags = format!(
            "{}{}",
            if entry.favorite() { "*" } else { "" },
            if entry.is_shared() { "S" } else { "" }
        );
        println!(
            "{:<id$}  {:<title$}  {:<user$}  {:<12}  {:<6}  {}",
            truncate_string(entry.effective_id(), ID_WIDTH),
            truncate_string(entry.title(), TITLE_WIDTH),
            truncate_string(entry.username(), USERNAME_WIDTH),
            entry.category().title(),
            flags,
            format_last_used(entry.last_used_at().as_ref()),
            id = ID_WIDTH,
            title = TITLE_WIDTH,
            user = USERNAME_WIDTH,
        );
    }
}

pub fn print_entry(entry: &UnifiedEntry, reveal: bool) {
    let record = entry.credential();
    println!("{}", record.title);
    println!("  Username:  {}", record.username);
    if reveal {
        println!("  Password:  {}", record.secret);
    } else {
        println!("  Password:  {}", mask_secret(&record.secret));
    }
    println!("  Website:   {}", format_optional(&record.website, "-"));
    println!("  Category:  {}", record.category);
    println!("  Strength:  {}", record.strength);
    println!("  Favorite:  {}", if record.favorite { "yes" } else { "no" });
    if let UnifiedEntry::Shared(link) = entry {
        println!("  Shared:    yes (link {}, record {})", link.link_id, record.id);
    }
    if let Some(ref notes) = record.notes {
        println!("  Notes:     {}", notes);
    }
    println!("  Created:   {}", format_date(&record.created_at));
    println!("  Updated:   {}", format_date(&record.updated_at));
    println!("  Last used: {}", format_last_used(record.last_used_at.as_ref()));
}

pub fn print_stats(stats: &SecurityStats) {
    println!("{} passwords", stats.total());
    for strength in Strength::ALL {
        println!(
            "  {:<7} {:>4}  {:>5.1}%",
            strength.to_string(),
            stats.count(strength),
            stats.percent(strength)
        );
    }
}

pub fn print_share_outcome(outcome: &ShareOutcome) {
    for result in &outcome.results {
        if result.is_failed() {
            println!(
                "  FAILED  {}: {}",
                result.email,
                result.reason.as_deref().unwrap_or("unknown error")
            );
        } else {
            println!("  OK      {}", result.email);
        }
    }
}

pub fn print_collaborators(collaborators: &[CollaboratorEntry]) {
    for collaborator in collaborators {
        println!(
            "  {} <{}>",
            collaborator.collaborator_name, collaborator.collaborator_email
        );
    }
}
