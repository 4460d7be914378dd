use std::ops::Deref;
use std::rc::Rc;

use gloo_console::error;
use shared::backend::{BackendError, RatingBackend};
use shared::filter::{
    majors, paginate, universities, FilterSession, Listing, ListingView, SubjectQuery, PAGE_SIZE,
};
use shared::powerup::FirstVisit;
use shared::{Subject, TAGS};
use yew::platform::spawn_local;
use yew::prelude::*;

use crate::app::add_course::AddCourseModal;
use crate::app::api::{supabase_config, BackendApi, GlooTransport};
use crate::app::fingerprint::BrowserProbe;
use crate::app::leaderboard::LeaderboardPanel;
use crate::app::spin_wheel::SpinWheelModal;
use crate::app::storage::BrowserStorage;
use crate::app::subject_card::SubjectCard;
use crate::app::util::{get_value_from_event, get_value_from_input_event, selected};
use crate::app::votes_past_hour::VotesPastHourBadge;

mod add_course;
mod api;
mod fingerprint;
mod leaderboard;
mod realtime;
mod spin_wheel;
mod storage;
mod subject_card;
mod util;
mod votes_past_hour;

pub struct ServiceSet {
    pub api: BackendApi,
    pub store: BrowserStorage,
    pub probe: BrowserProbe,
}

/// Shared handle to the backend, local storage and fingerprint probe.
#[derive(Clone)]
pub struct Services(Rc<ServiceSet>);

impl PartialEq for Services {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Services {
    type Target = ServiceSet;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub enum AppMsg {
    SubjectsLoaded(Result<Vec<Subject>, BackendError>),
    UpdateName(String),
    UpdateMajor(String),
    UpdateUniversity(String),
    ToggleTag(&'static str),
    ClearFilters,
    Filtered(Option<Vec<Subject>>),
    ShowMore,
    ToggleWheel(bool),
    ToggleAddCourse(bool),
    ReloadSubjects,
    VoteInserted,
}

pub struct App {
    services: Result<Services, String>,
    subjects: Vec<Subject>,
    listing: Listing,
    query: SubjectQuery,
    session: FilterSession,
    pages_shown: usize,
    warn_message: Option<String>,
    show_wheel: bool,
    show_add_course: bool,
    live_version: u32,
}

impl App {
    fn load_subjects(&self, ctx: &Context<Self>) {
        let Ok(services) = self.services.clone() else {
            return;
        };

        ctx.link().send_future(async move {
            AppMsg::SubjectsLoaded(services.api.fetch_subjects().await)
        });
    }

    fn run_filter(&mut self, ctx: &Context<Self>) {
        let Ok(services) = self.services.clone() else {
            return;
        };
        self.pages_shown = 1;

        let session = self.session.clone();
        let ticket = session.begin();
        let subjects = self.subjects.clone();
        let query = self.query.clone();
        ctx.link().send_future(async move {
            AppMsg::Filtered(session.run(ticket, &services.api, &subjects, &query).await)
        });
    }

    fn view_filters(&self, ctx: &Context<Self>) -> Html {
        let on_name = ctx
            .link()
            .callback(|e: InputEvent| AppMsg::UpdateName(get_value_from_input_event(e)));
        let on_major = ctx
            .link()
            .callback(|e: Event| AppMsg::UpdateMajor(get_value_from_event(e)));
        let on_university = ctx
            .link()
            .callback(|e: Event| AppMsg::UpdateUniversity(get_value_from_event(e)));

        let major = self.query.major.clone().unwrap_or_default();
        let university = self.query.university.clone().unwrap_or_default();

        html! {
            <div class="search-bar">
                <input placeholder="Search courses" value={self.query.name.clone()} oninput={on_name}/>
                <select onchange={on_major}>
                    <option value="" selected={major.is_empty()}>{ "All majors" }</option>
                    { for majors(&self.subjects).into_iter().map(|m| html! {
                        <option selected={m == major} value={m.clone()}>{ m }</option>
                    }) }
                </select>
                <select onchange={on_university}>
                    <option value="" selected={university.is_empty()}>{ "All schools" }</option>
                    { for universities(&self.subjects).into_iter().map(|u| html! {
                        <option selected={u == university} value={u.clone()}>{ u }</option>
                    }) }
                </select>
                <div class="tag-filter">
                    { for TAGS.iter().map(|&tag| {
                        let class = if self.query.tags.iter().any(|t| t == tag) { "tag selected" } else { "tag" };
                        html! {
                            <button {class} onclick={ctx.link().callback(move |_| AppMsg::ToggleTag(tag))}>{ tag }</button>
                        }
                    }) }
                </div>
                <button class="clear" onclick={ctx.link().callback(|_| AppMsg::ClearFilters)}>{ "Clear filters" }</button>
            </div>
        }
    }

    fn view_subjects(&self, ctx: &Context<Self>, services: &Services) -> Html {
        let filtered = match self.listing.view() {
            ListingView::Loading => {
                return html! { <div class="loading">{ "Loading subjects..." }</div> }
            }
            ListingView::Empty => {
                return html! { <div class="empty">{ "No subjects found matching your filters" }</div> }
            }
            ListingView::Subjects(filtered) => filtered,
        };

        let page = paginate(filtered, self.pages_shown, PAGE_SIZE);
        let on_voted = ctx.link().callback(|_| AppMsg::VoteInserted);

        html! {
            <>
            <div class="subject-grid">
                { for page.items.iter().map(|subject| html! {
                    <SubjectCard
                        key={subject.id.to_string()}
                        services={services.clone()}
                        subject={subject.clone()}
                        live_version={self.live_version}
                        on_voted={on_voted.clone()}
                    />
                }) }
            </div>
            {
                if page.has_more {
                    html! { <button class="show-more" onclick={ctx.link().callback(|_| AppMsg::ShowMore)}>{ "Show more" }</button> }
                } else {
                    html! {}
                }
            }
            </>
        }
    }
}

impl Component for App {
    type Message = AppMsg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let services = supabase_config()
            .map(|config| {
                spawn_local(realtime::subscribe_votes(
                    config.clone(),
                    ctx.link().callback(|_| AppMsg::VoteInserted),
                ));

                Services(Rc::new(ServiceSet {
                    api: BackendApi::new(config, GlooTransport),
                    store: BrowserStorage,
                    probe: BrowserProbe,
                }))
            })
            .map_err(|err| err.to_string());

        let show_wheel = match &services {
            Ok(services) => FirstVisit::new(&services.store).take(),
            Err(err) => {
                error!(err.clone());
                false
            }
        };

        let app = Self {
            warn_message: services.as_ref().err().cloned(),
            services,
            subjects: Vec::new(),
            listing: Listing::new(),
            query: SubjectQuery::default(),
            session: FilterSession::new(),
            pages_shown: 1,
            show_wheel,
            show_add_course: false,
            live_version: 0,
        };
        app.load_subjects(ctx);
        app
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            AppMsg::SubjectsLoaded(result) => {
                match result {
                    Ok(subjects) => {
                        self.subjects = subjects;
                        self.run_filter(ctx);
                    }
                    Err(err) => {
                        self.listing.fail();
                        error!(format!("Error fetching subjects: {err}"));
                        self.warn_message = Some("Failed to load subjects".to_string());
                    }
                }
            }
            AppMsg::UpdateName(v) => {
                self.query.name = v;
                self.run_filter(ctx);
            }
            AppMsg::UpdateMajor(v) => {
                self.query.major = selected(v);
                self.run_filter(ctx);
            }
            AppMsg::UpdateUniversity(v) => {
                self.query.university = selected(v);
                self.run_filter(ctx);
            }
            AppMsg::ToggleTag(tag) => {
                if let Some(pos) = self.query.tags.iter().position(|t| t == tag) {
                    self.query.tags.remove(pos);
                } else {
                    self.query.tags.push(tag.to_string());
                }
                self.run_filter(ctx);
            }
            AppMsg::ClearFilters => {
                self.query = SubjectQuery::default();
                self.run_filter(ctx);
            }
            AppMsg::Filtered(result) => return self.listing.apply(result),
            AppMsg::ShowMore => self.pages_shown += 1,
            AppMsg::ToggleWheel(open) => self.show_wheel = open,
            AppMsg::ToggleAddCourse(open) => self.show_add_course = open,
            AppMsg::ReloadSubjects => self.load_subjects(ctx),
            AppMsg::VoteInserted => self.live_version = self.live_version.wrapping_add(1),
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let services = match &self.services {
            Ok(services) => services.clone(),
            Err(err) => return html! { <div class="fatal">{ err }</div> },
        };

        html! {
            <>
            <header class="hdr">
                <h1>{ "Gradence" }</h1>
                <VotesPastHourBadge services={services.clone()} live_version={self.live_version}/>
                <button onclick={ctx.link().callback(|_| AppMsg::ToggleWheel(true))}>{ "🎡 Daily spin" }</button>
                <button onclick={ctx.link().callback(|_| AppMsg::ToggleAddCourse(true))}>{ "➕ Add course" }</button>
            </header>
            { self.view_filters(ctx) }
            {
                if let Some(warn) = &self.warn_message {
                    html! { <div class="warn">{ warn }</div> }
                } else {
                    html! {}
                }
            }
            { self.view_subjects(ctx, &services) }
            <LeaderboardPanel services={services.clone()} live_version={self.live_version}/>
            {
                if self.show_wheel {
                    html! {
                        <SpinWheelModal
                            services={services.clone()}
                            on_close={ctx.link().callback(|_| AppMsg::ToggleWheel(false))}
                        />
                    }
                } else {
                    html! {}
                }
            }
            {
                if self.show_add_course {
                    html! {
                        <AddCourseModal
                            services={services.clone()}
                            subjects={self.subjects.clone()}
                            on_added={ctx.link().callback(|_| AppMsg::ReloadSubjects)}
                            on_close={ctx.link().callback(|_| AppMsg::ToggleAddCourse(false))}
                        />
                    }
                } else {
                    html! {}
                }
            }
            </>
        }
    }
}
