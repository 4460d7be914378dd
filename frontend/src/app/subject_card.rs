use chrono::Utc;
use gloo_console::error;
use shared::backend::RatingBackend;
use shared::ledger::VoteLedger;
use shared::stats::SubjectStats;
use shared::voting::{Eligibility, Mood, VoteDraft, VoteError, VoteReceipt, VotingBooth};
use shared::{Subject, VoteValue, FEEDBACK_MAX_CHARS, TAGS};
use yew::prelude::*;

use crate::app::util::get_value_from_textarea_event;
use crate::app::Services;

#[derive(Clone, PartialEq, Properties)]
pub struct SubjectCardProps {
    pub services: Services,
    pub subject: Subject,
    pub live_version: u32,
    pub on_voted: Callback<()>,
}

pub enum CardMsg {
    StatsLoaded(Option<SubjectStats>),
    Pick(VoteValue),
    ToggleTag(&'static str),
    UpdateFeedback(String),
    Cancel,
    Submit,
    Submitted(Result<VoteReceipt, VoteError>),
}

pub struct SubjectCard {
    stats: Option<SubjectStats>,
    picked: Option<VoteValue>,
    tags: Vec<&'static str>,
    feedback: String,
    submitting: bool,
    warn_message: Option<String>,
    mood: Option<Mood>,
}

impl SubjectCard {
    fn load_stats(ctx: &Context<Self>) {
        let services = ctx.props().services.clone();
        let id = ctx.props().subject.id.clone();

        ctx.link().send_future(async move {
            match services.api.subject_stats(&id).await {
                Ok(stats) => CardMsg::StatsLoaded(stats),
                Err(err) => {
                    error!(format!("Error fetching subject stats: {err}"));
                    CardMsg::StatsLoaded(None)
                }
            }
        });
    }

    fn reset_form(&mut self) {
        self.picked = None;
        self.tags.clear();
        self.feedback.clear();
    }

    fn view_meter(&self) -> Html {
        let Some(stats) = &self.stats else {
            return html! {};
        };

        html! {
            <div class="cool-o-meter">
                <span>{ "Hard" }</span>
                <div class="meter">
                    <div class="needle" style={format!("left: {}%", stats.cool_o_meter())}></div>
                </div>
                <span>{ "Fun" }</span>
                <div class="total">{ format!("{} votes", stats.total_votes) }</div>
                <div class="tags">
                    { for stats.top_tags().into_iter().map(|tag| html! { <span class="tag">{ tag }</span> }) }
                </div>
            </div>
        }
    }

    fn view_form(&self, ctx: &Context<Self>, value: VoteValue) -> Html {
        let on_feedback = ctx.link().callback(|e: InputEvent| {
            CardMsg::UpdateFeedback(get_value_from_textarea_event(e))
        });

        html! {
            <div class="vote-form">
                <div class="picked">{ format!("{} {}", value.emoji(), value) }</div>
                <div class="tag-picker">
                    { for TAGS.iter().map(|&tag| {
                        let class = if self.tags.contains(&tag) { "tag selected" } else { "tag" };
                        html! {
                            <button {class} onclick={ctx.link().callback(move |_| CardMsg::ToggleTag(tag))}>
                                { tag }
                            </button>
                        }
                    }) }
                </div>
                <textarea
                    placeholder="Anything else? (optional)"
                    maxlength={FEEDBACK_MAX_CHARS.to_string()}
                    value={self.feedback.clone()}
                    oninput={on_feedback}
                />
                <div class="counter">{ format!("{}/{}", self.feedback.chars().count(), FEEDBACK_MAX_CHARS) }</div>
                <div class="actions">
                    <button onclick={ctx.link().callback(|_| CardMsg::Cancel)}>{ "Cancel" }</button>
                    <button class="submit" disabled={self.submitting} onclick={ctx.link().callback(|_| CardMsg::Submit)}>
                        { if self.submitting { "Submitting..." } else { "Submit vote" } }
                    </button>
                </div>
            </div>
        }
    }
}

impl Component for SubjectCard {
    type Message = CardMsg;
    type Properties = SubjectCardProps;

    fn create(ctx: &Context<Self>) -> Self {
        Self::load_stats(ctx);

        Self {
            stats: None,
            picked: None,
            tags: Vec::new(),
            feedback: String::new(),
            submitting: false,
            warn_message: None,
            mood: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            CardMsg::StatsLoaded(stats) => self.stats = stats,
            CardMsg::Pick(value) => {
                self.picked = Some(value);
                self.warn_message = None;
            }
            CardMsg::ToggleTag(tag) => {
                if let Some(pos) = self.tags.iter().position(|t| *t == tag) {
                    self.tags.remove(pos);
                } else {
                    self.tags.push(tag);
                }
            }
            CardMsg::UpdateFeedback(v) => {
                self.feedback = v.chars().take(FEEDBACK_MAX_CHARS).collect();
            }
            CardMsg::Cancel => self.reset_form(),
            CardMsg::Submit => {
                let Some(value) = self.picked else {
                    return false;
                };
                if self.submitting {
                    return false;
                }
                self.submitting = true;

                let mut draft = VoteDraft::new(ctx.props().subject.id.clone(), value);
                draft.tags = self.tags.iter().map(|t| t.to_string()).collect();
                draft.feedback = self.feedback.clone();

                let services = ctx.props().services.clone();
                ctx.link().send_future(async move {
                    let booth = VotingBooth::new(&services.store, &services.api, &services.probe);
                    CardMsg::Submitted(booth.submit(&draft, Utc::now()).await)
                });
            }
            CardMsg::Submitted(result) => {
                self.submitting = false;
                match result {
                    Ok(receipt) => {
                        self.mood = Some(receipt.mood);
                        self.warn_message = None;
                        self.reset_form();
                        Self::load_stats(ctx);
                        ctx.props().on_voted.emit(());
                    }
                    Err(err) => self.warn_message = Some(err.to_string()),
                }
            }
        }
        true
    }

    fn changed(&mut self, ctx: &Context<Self>, old_props: &Self::Properties) -> bool {
        if ctx.props().subject.id != old_props.subject.id {
            self.stats = None;
            self.reset_form();
            self.mood = None;
            self.warn_message = None;
        }
        if ctx.props().subject.id != old_props.subject.id
            || ctx.props().live_version != old_props.live_version
        {
            Self::load_stats(ctx);
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let subject = &ctx.props().subject;
        let store = &ctx.props().services.store;
        let voted = VoteLedger::new(store).vote_value(&subject.id);
        let eligibility = shared::voting::eligibility(store, &subject.id);

        let class = match self.mood {
            Some(Mood::Celebrate) => "subject-card celebrate",
            Some(Mood::Sad) => "subject-card sad",
            None => "subject-card",
        };

        html! {
            <div {class}>
                <h3>{ &subject.name }</h3>
                <div class="meta">
                    { subject.major.as_deref().unwrap_or_default() }
                    { " · " }
                    { subject.university.as_deref().unwrap_or_default() }
                </div>
                { self.view_meter() }
                {
                    if let Some(value) = self.picked {
                        self.view_form(ctx, value)
                    } else if eligibility.can_vote() {
                        html! {
                            <div class="vote-buttons">
                                {
                                    if eligibility == Eligibility::VoteAgain {
                                        html! { <div class="powerup-hint">{ "🔁 Vote again is ready" }</div> }
                                    } else {
                                        html! {}
                                    }
                                }
                                { for VoteValue::ALL.iter().map(|&value| html! {
                                    <button title={value.to_string()} onclick={ctx.link().callback(move |_| CardMsg::Pick(value))}>
                                        { value.emoji() }
                                    </button>
                                }) }
                            </div>
                        }
                    } else if let Some(value) = voted {
                        html! { <div class="voted">{ format!("You voted {} {}", value.emoji(), value) }</div> }
                    } else {
                        html! {}
                    }
                }
                {
                    if let Some(warn) = &self.warn_message {
                        html! { <div class="warn">{ warn }</div> }
                    } else {
                        html! {}
                    }
                }
            </div>
        }
    }
}
