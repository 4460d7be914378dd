use std::time::Duration;

use shared::backend::RatingBackend;
use shared::stats::{load_leaderboard, Leaderboard, VotesPastHour};
use tokio::time::sleep;

/// Reprints the leaderboard every `interval` until interrupted.
pub async fn watch<B: RatingBackend + ?Sized>(backend: &B, interval: Duration) -> anyhow::Result<()> {
    tracing::info!(interval_secs = interval.as_secs(), "watching vote activity");

    loop {
        print_leaderboard(backend).await;
        println!();

        tokio::select! {
            _ = sleep(interval) => {}
            res = tokio::signal::ctrl_c() => {
                res?;
                tracing::info!("watch stopped");
                return Ok(());
            }
        }
    }
}

pub async fn print_leaderboard<B: RatingBackend + ?Sized>(backend: &B) {
    let (board, hour) = load_board(backend).await;

    if let Some(overall) = board.overall {
        println!(
            "{} subjects, {} votes, {} voters, average {:.2}",
            overall.total_subjects, overall.total_votes, overall.total_users, overall.average_vote
        );
    }
    if let Some(hour) = hour {
        println!(
            "{} votes from {} voters in the past hour",
            hour.votes_past_hour, hour.unique_voters_past_hour
        );
    }

    println!("\nMost loved");
    for (i, subject) in board.top_positive.iter().enumerate() {
        println!("  {}. {} ({:.2})", i + 1, subject.subject_name, subject.average_rating);
    }

    println!("\nMost boring");
    for (i, subject) in board.top_boring.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, subject.subject_name, subject.total_rating_sum);
    }

    println!("\nTrending today");
    for subject in &board.trending {
        println!(
            "  {}. {} ({} votes, average {:.2})",
            subject.rank_position, subject.subject_name, subject.todays_votes, subject.average_vote
        );
    }
}

async fn load_board<B: RatingBackend + ?Sized>(backend: &B) -> (Leaderboard, Option<VotesPastHour>) {
    let board = load_leaderboard(backend).await;
    let hour = match backend.votes_past_hour().await {
        Ok(hour) => hour,
        Err(err) => {
            tracing::error!(%err, "can't load votes past hour");
            None
        }
    };

    (board, hour)
}
