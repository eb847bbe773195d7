use axum::{debug_handler, extract::{Path, State}, response::{Html, IntoResponse, Response}, Form};
use time::OffsetDateTime;
use tower_sessions::Session;
use tracing::warn;

use crate::{
    error::ActionError,
    include_res,
    res::{self, escape},
    session::{self, Flash, Identity},
    AppResult, AppState,
};

use super::{input_date, ops::{self, EventListing}, EventForm};

fn event_html(listing: &EventListing, me: Option<&Identity>) -> String {
    let event = &listing.event;
    let id = event.id.to_string();

    let image = match &event.image_url {
        Some(url) => format!(r#"<img src="{}" alt="">"#, escape(url)),
        None => String::new(),
    };
    let participants = match event.max_participants {
        Some(max) => format!("{} / {max} joined", listing.participation.count),
        None => format!("{} joined", listing.participation.count),
    };
    let membership = match me {
        None => String::new(),
        Some(_) if listing.participation.joined => {
            format!(r#"<form method="post" action="/events/{id}/leave" class="json"><button type="submit">Leave</button></form>"#)
        }
        Some(_) if listing.is_full() => r#"<button type="button" disabled>Full</button>"#.to_owned(),
        Some(_) => format!(r#"<form method="post" action="/events/{id}/join" class="json"><button type="submit">Join</button></form>"#),
    };
    let actions = match me {
        Some(me) if me.email == event.created_by => {
            res::fill(include_res!(str, "/pages/events/actions.html"), &[("id", id.as_str())])
        }
        _ => String::new(),
    };

    res::fill(
        include_res!(str, "/pages/events/item.html"),
        &[
            ("status_class", listing.status.as_str().to_lowercase().as_str()),
            ("id", id.as_str()),
            ("title", escape(&event.title).as_ref()),
            ("status", listing.status.as_str()),
            ("date", res::when(event.event_date).as_str()),
            ("location", escape(&event.location).as_ref()),
            ("created_by", escape(&event.created_by).as_ref()),
            ("image", image.as_str()),
            ("description", escape(&event.description).as_ref()),
            ("participants", participants.as_str()),
            ("membership", membership.as_str()),
            ("actions", actions.as_str()),
        ],
    )
}

fn form_html(heading: &str, action: &str, form: &EventForm, err: Option<&ActionError>) -> String {
    res::fill(
        include_res!(str, "/pages/events/form.html"),
        &[
            ("heading", heading),
            ("errors", res::errors_html(err).as_str()),
            ("action", action),
            ("title", escape(&form.title).as_ref()),
            ("event_date", escape(&form.event_date).as_ref()),
            ("location", escape(&form.location).as_ref()),
            ("max_participants", escape(&form.max_participants).as_ref()),
            ("image_url", escape(&form.image_url).as_ref()),
            ("description", escape(&form.description).as_ref()),
        ],
    )
}

async fn bounce(session: &Session, err: ActionError) -> AppResult<Response> {
    let to = match err {
        ActionError::LoginRequired(_) => "/login",
        _ => "/events",
    };
    session::redirect_with(session, Flash::error(err.to_string()), to).await
}

#[debug_handler]
pub(crate) async fn index(State(state): State<AppState>, session: Session) -> AppResult<Html<String>> {
    let me = session::identity(&session).await?;
    let mut flash = session::take_flash(&session).await?;

    let listings = match ops::list(state.backend.as_ref(), me.as_ref(), OffsetDateTime::now_utc()).await {
        Ok(listings) => listings,
        Err(err) => {
            warn!("event list unavailable: {err}");
            flash = Some(Flash::error(err.to_string()));
            Vec::new()
        }
    };

    let items: String = listings.iter().map(|l| event_html(l, me.as_ref())).collect();
    let body = res::fill(include_res!(str, "/pages/events/index.html"), &[("events", items.as_str())]);
    Ok(res::page("Events", me.as_ref(), flash.as_ref(), &body))
}

#[debug_handler]
pub(crate) async fn new_page(session: Session) -> AppResult<Response> {
    let Some(me) = session::identity(&session).await? else {
        return bounce(&session, ActionError::LoginRequired("Please login to create an event.")).await;
    };
    let flash = session::take_flash(&session).await?;
    let body = form_html("New event", "/events/new", &EventForm::default(), None);
    Ok(res::page("New event", Some(&me), flash.as_ref(), &body).into_response())
}

#[debug_handler]
pub(crate) async fn create(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<EventForm>,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    match ops::create(state.backend.as_ref(), me.as_ref(), &form, OffsetDateTime::now_utc()).await {
        Ok(()) => session::redirect_with(&session, Flash::success("Event created successfully!"), "/events").await,
        Err(err @ ActionError::LoginRequired(_)) => bounce(&session, err).await,
        Err(err) => {
            let body = form_html("New event", "/events/new", &form, Some(&err));
            Ok((err.status(), res::page("New event", me.as_ref(), None, &body)).into_response())
        }
    }
}

#[debug_handler]
pub(crate) async fn edit_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    session: Session,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    let event = match ops::owned(state.backend.as_ref(), me.as_ref(), id, ops::EDIT_DENIED).await {
        Ok(event) => event,
        Err(err) => return bounce(&session, err).await,
    };

    let flash = session::take_flash(&session).await?;
    let form = EventForm {
        title: event.title,
        description: event.description,
        event_date: input_date(event.event_date),
        location: event.location,
        max_participants: event.max_participants.map(|n| n.to_string()).unwrap_or_default(),
        image_url: event.image_url.unwrap_or_default(),
    };
    let body = form_html("Edit event", &format!("/events/{id}/edit"), &form, None);
    Ok(res::page("Edit event", me.as_ref(), flash.as_ref(), &body).into_response())
}

#[debug_handler]
pub(crate) async fn edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    session: Session,
    Form(form): Form<EventForm>,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    match ops::edit(state.backend.as_ref(), me.as_ref(), id, &form).await {
        Ok(()) => session::redirect_with(&session, Flash::success("Event updated successfully!"), "/events").await,
        Err(err @ (ActionError::LoginRequired(_) | ActionError::Forbidden(_))) => bounce(&session, err).await,
        Err(err) => {
            let body = form_html("Edit event", &format!("/events/{id}/edit"), &form, Some(&err));
            Ok((err.status(), res::page("Edit event", me.as_ref(), None, &body)).into_response())
        }
    }
}

#[debug_handler]
pub(crate) async fn delete_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    session: Session,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    let event = match ops::owned(state.backend.as_ref(), me.as_ref(), id, ops::DELETE_DENIED).await {
        Ok(event) => event,
        Err(err) => return bounce(&session, err).await,
    };

    let flash = session::take_flash(&session).await?;
    let body = res::fill(
        include_res!(str, "/pages/events/delete.html"),
        &[
            ("title", escape(&event.title).as_ref()),
            ("date", res::when(event.event_date).as_str()),
            ("location", escape(&event.location).as_ref()),
            ("id", id.to_string().as_str()),
        ],
    );
    Ok(res::page("Delete event", me.as_ref(), flash.as_ref(), &body).into_response())
}

#[debug_handler]
pub(crate) async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    session: Session,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    match ops::delete(state.backend.as_ref(), me.as_ref(), id).await {
        Ok(()) => session::redirect_with(&session, Flash::success("Event deleted successfully!"), "/events").await,
        Err(err @ (ActionError::LoginRequired(_) | ActionError::Forbidden(_))) => bounce(&session, err).await,
        Err(err) => {
            session::redirect_with(&session, Flash::error(err.to_string()), &format!("/events/{id}/delete")).await
        }
    }
}
