use shared::stats::{load_leaderboard, Leaderboard};
use yew::prelude::*;

use crate::app::Services;

#[derive(Clone, PartialEq, Properties)]
pub struct LeaderboardProps {
    pub services: Services,
    /// Bumped whenever a vote lands anywhere.
    pub live_version: u32,
}

pub enum LeaderboardMsg {
    Loaded(Leaderboard),
}

pub struct LeaderboardPanel {
    board: Option<Leaderboard>,
}

impl LeaderboardPanel {
    fn load(ctx: &Context<Self>) {
        let services = ctx.props().services.clone();
        ctx.link().send_future(async move {
            LeaderboardMsg::Loaded(load_leaderboard(&services.api).await)
        });
    }
}

impl Component for LeaderboardPanel {
    type Message = LeaderboardMsg;
    type Properties = LeaderboardProps;

    fn create(ctx: &Context<Self>) -> Self {
        Self::load(ctx);
        Self { board: None }
    }

    fn update(&mut self, _ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            LeaderboardMsg::Loaded(board) => self.board = Some(board),
        }
        true
    }

    fn changed(&mut self, ctx: &Context<Self>, old_props: &Self::Properties) -> bool {
        if ctx.props().live_version != old_props.live_version {
            Self::load(ctx);
        }
        false
    }

    fn view(&self, _ctx: &Context<Self>) -> Html {
        let Some(board) = &self.board else {
            return html! { <div class="leaderboard loading">{ "Loading leaderboard..." }</div> };
        };

        html! {
            <div class="leaderboard">
                {
                    if let Some(overall) = &board.overall {
                        html! {
                            <div class="overall">
                                <span>{ format!("{} subjects", overall.total_subjects) }</span>
                                <span>{ format!("{} votes", overall.total_votes) }</span>
                                <span>{ format!("{} voters", overall.total_users) }</span>
                            </div>
                        }
                    } else {
                        html! {}
                    }
                }
                <div class="panel">
                    <h3>{ "🔥 Most loved" }</h3>
                    <ol>
                        { for board.top_positive.iter().map(|s| html! {
                            <li>{ format!("{} ({:.1})", s.subject_name, s.average_rating) }</li>
                        }) }
                    </ol>
                </div>
                <div class="panel">
                    <h3>{ "😴 Most boring" }</h3>
                    <ol>
                        { for board.top_boring.iter().map(|s| html! {
                            <li>{ format!("{} ({})", s.subject_name, s.total_rating_sum) }</li>
                        }) }
                    </ol>
                </div>
                <div class="panel">
                    <h3>{ "📈 Trending today" }</h3>
                    <ol>
                        { for board.trending.iter().map(|s| html! {
                            <li>{ format!("{} ({} votes today)", s.subject_name, s.todays_votes) }</li>
                        }) }
                    </ol>
                </div>
            </div>
        }
    }
}
