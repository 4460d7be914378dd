use chrono::Utc;
use gloo_timers::callback::Timeout;
use shared::powerup::{SpinAvailability, SpinOutcome, SpinWheel, WHEEL};
use yew::prelude::*;

use crate::app::Services;

/// Matches the CSS transition on `.wheel`.
const SPIN_ANIMATION_MS: u32 = 4_000;
const SLICE_DEGREES: usize = 360 / WHEEL.len();

#[derive(Clone, PartialEq, Properties)]
pub struct SpinWheelProps {
    pub services: Services,
    pub on_close: Callback<()>,
}

pub enum SpinMsg {
    Spin,
    Settled,
}

pub struct SpinWheelModal {
    rotation: u32,
    spinning: bool,
    outcome: Option<SpinOutcome>,
    message: Option<String>,
    settle: Option<Timeout>,
}

impl SpinWheelModal {
    fn availability(ctx: &Context<Self>) -> SpinAvailability {
        SpinWheel::new(&ctx.props().services.store).availability(Utc::now())
    }
}

impl Component for SpinWheelModal {
    type Message = SpinMsg;
    type Properties = SpinWheelProps;

    fn create(_ctx: &Context<Self>) -> Self {
        Self {
            rotation: 0,
            spinning: false,
            outcome: None,
            message: None,
            settle: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            SpinMsg::Spin => {
                if self.spinning {
                    return false;
                }

                let wheel = SpinWheel::new(&ctx.props().services.store);
                match wheel.spin_from(self.rotation, &mut rand::thread_rng(), Utc::now()) {
                    Ok(outcome) => {
                        self.rotation = outcome.rotation;
                        self.spinning = true;
                        self.outcome = Some(outcome);
                        self.message = None;

                        let link = ctx.link().clone();
                        self.settle = Some(Timeout::new(SPIN_ANIMATION_MS, move || {
                            link.send_message(SpinMsg::Settled)
                        }));
                    }
                    Err(err) => self.message = Some(err.to_string()),
                }
            }
            SpinMsg::Settled => {
                self.spinning = false;
                self.message = self.outcome.map(|outcome| outcome.prize.to_string());
            }
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let availability = Self::availability(ctx);
        let can_spin = !self.spinning && !matches!(availability, SpinAvailability::CoolingDown { .. });
        let on_close = ctx.props().on_close.reform(|_: MouseEvent| ());

        html! {
            <div class="modal-backdrop">
                <div class="modal spin-modal">
                    <button class="close" onclick={on_close}>{ "✕" }</button>
                    <h2>{ "Daily Spin" }</h2>
                    <div class="wheel-pointer"></div>
                    <div class="wheel" style={format!("transform: rotate({}deg)", self.rotation)}>
                        { for WHEEL.iter().enumerate().map(|(i, prize)| html! {
                            <div class="slice" style={format!("transform: rotate({}deg)", i * SLICE_DEGREES)}>
                                <span>{ prize.to_string() }</span>
                            </div>
                        }) }
                    </div>
                    <button class="spin" disabled={!can_spin} onclick={ctx.link().callback(|_| SpinMsg::Spin)}>
                        {
                            match availability {
                                SpinAvailability::Bonus => "Bonus spin!".to_string(),
                                SpinAvailability::Ready => "Spin".to_string(),
                                SpinAvailability::CoolingDown { remaining } => format!(
                                    "Next spin in {}h {}m",
                                    remaining.num_hours(),
                                    remaining.num_minutes() % 60
                                ),
                            }
                        }
                    </button>
                    {
                        if let Some(message) = &self.message {
                            html! { <div class="spin-result">{ message }</div> }
                        } else {
                            html! {}
                        }
                    }
                </div>
            </div>
        }
    }
}
