use std::fmt::{Display, Formatter};
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use shared::backend::RatingBackend;
use shared::course::add_course;
use shared::filter::{filter_subjects, paginate, SubjectQuery, PAGE_SIZE};
use shared::identity::{compute_fingerprint, DeviceIdentity};
use shared::ledger::VoteLedger;
use shared::powerup::{FlagState, PowerUp, PowerUps, SpinAvailability, SpinWheel};
use shared::voting::{Eligibility, Mood, VoteDraft, VotingBooth};
use shared::{SubjectId, VoteValue, VoteWeight, TAGS};

use crate::file_store::FileStore;
use crate::fingerprint::HostProbe;
use crate::supabase::SupabaseClient;
use crate::tasks;

#[derive(Parser, Debug)]
#[command(
    name = "gradence",
    version,
    about = "Rate your courses anonymously",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List subjects, optionally filtered
    Subjects {
        /// Case-insensitive part of the course name
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        major: Option<String>,
        #[arg(long)]
        university: Option<String>,
        /// Only subjects with this tag in their top three (repeatable)
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<String>,
        /// How many pages of results to show
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Vote on a subject
    Vote {
        subject_id: String,
        /// One of -2, -1, 1, 2
        #[arg(value_parser = parse_vote, allow_negative_numbers = true)]
        value: VoteValue,
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<String>,
        #[arg(long, default_value = "")]
        feedback: String,
    },
    /// Spin the daily wheel
    Spin,
    /// Show the leaderboard
    Leaderboard,
    /// Add a course that is not listed yet
    AddCourse {
        name: String,
        #[arg(long)]
        university: String,
        #[arg(long)]
        major: String,
    },
    /// Show this device's identity and power-ups
    #[command(name = "whoami")]
    WhoAmI,
    /// Reprint the leaderboard until interrupted
    Watch,
}

fn parse_tag(raw: &str) -> Result<String, String> {
    let tag = raw.trim().to_lowercase();
    if TAGS.contains(&tag.as_str()) {
        Ok(tag)
    } else {
        Err(format!("expected one of: {}", TAGS.join(", ")))
    }
}

fn parse_vote(raw: &str) -> Result<VoteValue, String> {
    raw.parse::<i64>()
        .ok()
        .and_then(VoteValue::from_value)
        .ok_or_else(|| "vote must be one of -2, -1, 1, 2".to_string())
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Command::Subjects { .. } => "subjects",
            Command::Vote { .. } => "vote",
            Command::Spin => "spin",
            Command::Leaderboard => "leaderboard",
            Command::AddCourse { .. } => "add-course",
            Command::WhoAmI => "whoami",
            Command::Watch => "watch",
        })
    }
}

/// Everything a command runs against.
pub struct Context {
    pub backend: SupabaseClient,
    pub store: FileStore,
    pub probe: HostProbe,
    pub watch_interval: Duration,
}

pub async fn run(command: Command, ctx: &Context) -> anyhow::Result<()> {
    tracing::debug!(%command, "running command");

    match command {
        Command::Subjects {
            name,
            major,
            university,
            tags,
            pages,
        } => {
            let query = SubjectQuery {
                name,
                major,
                university,
                tags,
            };
            list_subjects(ctx, &query, pages).await
        }
        Command::Vote {
            subject_id,
            value,
            tags,
            feedback,
        } => {
            let mut draft = VoteDraft::new(SubjectId(subject_id), value);
            draft.tags = tags;
            draft.feedback = feedback;
            vote(ctx, &draft).await
        }
        Command::Spin => spin(ctx),
        Command::Leaderboard => {
            tasks::print_leaderboard(&ctx.backend).await;
            Ok(())
        }
        Command::AddCourse {
            name,
            university,
            major,
        } => {
            let existing = ctx.backend.fetch_subjects().await?;
            let subject = add_course(&ctx.backend, &existing, &name, &university, &major).await?;
            println!("Added {} ({})", subject.name, university.trim());
            Ok(())
        }
        Command::WhoAmI => {
            whoami(ctx).await;
            Ok(())
        }
        Command::Watch => tasks::watch(&ctx.backend, ctx.watch_interval).await,
    }
}

async fn list_subjects(ctx: &Context, query: &SubjectQuery, pages: usize) -> anyhow::Result<()> {
    let subjects = ctx.backend.fetch_subjects().await?;
    let filtered = filter_subjects(&ctx.backend, &subjects, query).await;

    if filtered.is_empty() {
        println!("No subjects found matching your filters");
        return Ok(());
    }

    let ledger = VoteLedger::new(&ctx.store);
    let page = paginate(&filtered, pages, PAGE_SIZE);

    for subject in page.items {
        let voted = ledger
            .vote_value(&subject.id)
            .map(|v| format!("  [voted {}]", v.emoji()))
            .unwrap_or_default();

        println!(
            "{}  {} | {} | {}{}",
            subject.id,
            subject.name,
            subject.major.as_deref().unwrap_or("-"),
            subject.university.as_deref().unwrap_or("-"),
            voted
        );
    }

    if page.has_more {
        println!(
            "... {} more, use --pages {}",
            filtered.len() - page.items.len(),
            pages.max(1) + 1
        );
    }

    Ok(())
}

async fn vote(ctx: &Context, draft: &VoteDraft) -> anyhow::Result<()> {
    let booth = VotingBooth::new(&ctx.store, &ctx.backend, &ctx.probe);

    if booth.eligibility(&draft.subject_id) == Eligibility::VoteAgain {
        println!("Using your vote-again power-up");
    }

    let receipt = booth.submit(draft, Utc::now()).await?;

    println!(
        "{} {}{}",
        receipt.value.emoji(),
        receipt.value,
        match receipt.mood {
            Mood::Celebrate => "  Nice!",
            Mood::Sad => "",
        }
    );
    if receipt.weight == VoteWeight::Double {
        println!("Double vote applied");
    }

    if let Some(stats) = ctx.backend.subject_stats(&draft.subject_id).await? {
        println!(
            "{} votes, cool-o-meter {}%, top tags: {}",
            stats.total_votes,
            stats.cool_o_meter(),
            stats.top_tags().join(", ")
        );
    }

    Ok(())
}

fn spin(ctx: &Context) -> anyhow::Result<()> {
    let wheel = SpinWheel::new(&ctx.store);
    let outcome = wheel.spin(&mut rand::thread_rng(), Utc::now())?;

    println!("{}", outcome.prize);
    match outcome.armed {
        Some(PowerUp::DoubleVote) => println!("Your next vote counts double"),
        Some(PowerUp::VoteAgain) => println!("You can change one vote you already cast"),
        None => {}
    }
    if wheel.availability(Utc::now()) == SpinAvailability::Bonus {
        println!("Bonus spin unlocked, run `gradence spin` again");
    }

    Ok(())
}

async fn whoami(ctx: &Context) {
    let device = DeviceIdentity::new(&ctx.store).get_or_create_device_id();
    let fingerprint = compute_fingerprint(&ctx.probe).await;
    let power_ups = PowerUps::new(&ctx.store);

    println!("device:      {device}");
    println!(
        "fingerprint: {}",
        fingerprint.as_ref().map(|f| f.as_str()).unwrap_or("-")
    );
    println!("state file:  {}", ctx.store.path().display());
    println!("votes cast:  {}", VoteLedger::new(&ctx.store).votes().len());

    for power_up in [PowerUp::DoubleVote, PowerUp::VoteAgain] {
        let state = match power_ups.state(power_up) {
            FlagState::Unset => "not won",
            FlagState::Armed => "ready",
            FlagState::Consumed => "used",
        };
        println!("{power_up:?}: {state}");
    }

    match SpinWheel::new(&ctx.store).availability(Utc::now()) {
        SpinAvailability::Ready => println!("wheel:       ready"),
        SpinAvailability::Bonus => println!("wheel:       bonus spin"),
        SpinAvailability::CoolingDown { remaining } => {
            println!("wheel:       next spin in {} minutes", remaining.num_minutes())
        }
    }
}
