use shared::course::{add_course, NewSubjectError};
use shared::filter::{majors, universities};
use shared::Subject;
use yew::prelude::*;

use crate::app::util::get_value_from_input_event;
use crate::app::Services;

#[derive(Clone, PartialEq, Properties)]
pub struct AddCourseProps {
    pub services: Services,
    pub subjects: Vec<Subject>,
    pub on_added: Callback<()>,
    pub on_close: Callback<()>,
}

pub enum AddCourseMsg {
    UpdateName(String),
    UpdateUniversity(String),
    UpdateMajor(String),
    Submit,
    Done(Result<(), NewSubjectError>),
}

pub struct AddCourseModal {
    name: String,
    university: String,
    major: String,
    submitting: bool,
    warn_message: Option<String>,
}

impl Component for AddCourseModal {
    type Message = AddCourseMsg;
    type Properties = AddCourseProps;

    fn create(_ctx: &Context<Self>) -> Self {
        Self {
            name: String::new(),
            university: String::new(),
            major: String::new(),
            submitting: false,
            warn_message: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            AddCourseMsg::UpdateName(v) => self.name = v,
            AddCourseMsg::UpdateUniversity(v) => self.university = v,
            AddCourseMsg::UpdateMajor(v) => self.major = v,
            AddCourseMsg::Submit => {
                if self.submitting {
                    return false;
                }
                self.submitting = true;

                let props = ctx.props().clone();
                let (name, university, major) =
                    (self.name.clone(), self.university.clone(), self.major.clone());
                ctx.link().send_future(async move {
                    let result = add_course(
                        &props.services.api,
                        &props.subjects,
                        &name,
                        &university,
                        &major,
                    )
                    .await;
                    AddCourseMsg::Done(result.map(|_| ()))
                });
            }
            AddCourseMsg::Done(result) => {
                self.submitting = false;
                match result {
                    Ok(()) => {
                        ctx.props().on_added.emit(());
                        ctx.props().on_close.emit(());
                    }
                    Err(err) => self.warn_message = Some(err.to_string()),
                }
            }
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let subjects = &ctx.props().subjects;
        let on_name = ctx
            .link()
            .callback(|e: InputEvent| AddCourseMsg::UpdateName(get_value_from_input_event(e)));
        let on_university = ctx
            .link()
            .callback(|e: InputEvent| AddCourseMsg::UpdateUniversity(get_value_from_input_event(e)));
        let on_major = ctx
            .link()
            .callback(|e: InputEvent| AddCourseMsg::UpdateMajor(get_value_from_input_event(e)));

        html! {
            <div class="modal-backdrop">
                <div class="modal add-course">
                    <button class="close" onclick={ctx.props().on_close.reform(|_: MouseEvent| ())}>{ "✕" }</button>
                    <h2>{ "Add a course" }</h2>
                    <input placeholder="Course name" value={self.name.clone()} oninput={on_name}/>
                    <input placeholder="School" list="known-schools" value={self.university.clone()} oninput={on_university}/>
                    <datalist id="known-schools">
                        { for universities(subjects).into_iter().map(|u| html! { <option value={u}/> }) }
                    </datalist>
                    <input placeholder="Major" list="known-majors" value={self.major.clone()} oninput={on_major}/>
                    <datalist id="known-majors">
                        { for majors(subjects).into_iter().map(|m| html! { <option value={m}/> }) }
                    </datalist>
                    <button class="submit" disabled={self.submitting} onclick={ctx.link().callback(|_| AddCourseMsg::Submit)}>
                        { if self.submitting { "Adding..." } else { "Add course" } }
                    </button>
                    {
                        if let Some(warn) = &self.warn_message {
                            html! { <div class="warn">{ warn }</div> }
                        } else {
                            html! {}
                        }
                    }
                </div>
            </div>
        }
    }
}
