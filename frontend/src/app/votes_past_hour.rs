use gloo_console::error;
use gloo_timers::callback::Interval;
use shared::backend::RatingBackend;
use shared::stats::VotesPastHour;
use yew::prelude::*;

use crate::app::Services;

const REFRESH_INTERVAL_MS: u32 = 60_000;

#[derive(Clone, PartialEq, Properties)]
pub struct VotesPastHourProps {
    pub services: Services,
    pub live_version: u32,
}

pub enum VotesPastHourMsg {
    Refresh,
    Loaded(Option<VotesPastHour>),
}

pub struct VotesPastHourBadge {
    counts: Option<VotesPastHour>,
    _interval: Interval,
}

impl Component for VotesPastHourBadge {
    type Message = VotesPastHourMsg;
    type Properties = VotesPastHourProps;

    fn create(ctx: &Context<Self>) -> Self {
        ctx.link().send_message(VotesPastHourMsg::Refresh);

        let link = ctx.link().clone();
        let interval = Interval::new(REFRESH_INTERVAL_MS, move || {
            link.send_message(VotesPastHourMsg::Refresh)
        });

        Self {
            counts: None,
            _interval: interval,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            VotesPastHourMsg::Refresh => {
                let services = ctx.props().services.clone();
                ctx.link().send_future(async move {
                    match services.api.votes_past_hour().await {
                        Ok(counts) => VotesPastHourMsg::Loaded(counts),
                        Err(err) => {
                            error!(format!("Error fetching votes past hour: {err}"));
                            VotesPastHourMsg::Loaded(None)
                        }
                    }
                });
                false
            }
            VotesPastHourMsg::Loaded(counts) => {
                self.counts = counts;
                true
            }
        }
    }

    fn changed(&mut self, ctx: &Context<Self>, old_props: &Self::Properties) -> bool {
        if ctx.props().live_version != old_props.live_version {
            ctx.link().send_message(VotesPastHourMsg::Refresh);
        }
        false
    }

    fn view(&self, _ctx: &Context<Self>) -> Html {
        let counts = self.counts.clone().unwrap_or_default();

        html! {
            <div class="votes-past-hour">
                <span class="pulse"></span>
                { format!(
                    "{} votes from {} voters in the last hour",
                    counts.votes_past_hour, counts.unique_voters_past_hour
                ) }
            </div>
        }
    }
}
