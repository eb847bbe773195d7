use time::OffsetDateTime;
use tracing::info;

use crate::{
    backend::Backend,
    db::{Event, EventChanges, EventStatus, JoinOutcome, NewEvent, Participation},
    error::{ActionError, OrFail},
    session::Identity,
};

use super::EventForm;

pub const EDIT_DENIED: &str = "You don't have permission to edit this event.";
pub const DELETE_DENIED: &str = "You don't have permission to delete this event.";

/// An event as listed, with what the reader needs to know about joining it.
#[derive(Debug, Clone, PartialEq)]
pub struct EventListing {
    pub event: Event,
    pub participation: Participation,
    pub status: EventStatus,
}

impl EventListing {
    pub fn is_full(&self) -> bool {
        self.event
            .max_participants
            .is_some_and(|max| self.participation.count >= usize::try_from(max).unwrap_or(0))
    }
}

/// Soonest first, with counts and membership from a single lookup.
pub async fn list(
    backend: &dyn Backend,
    me: Option<&Identity>,
    now: OffsetDateTime,
) -> Result<Vec<EventListing>, ActionError> {
    let events = backend.list_events().await.or_fail("Failed to load events.")?;
    let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
    let participation = backend
        .participation(&ids, me.map(|me| me.id))
        .await
        .or_fail("Failed to load events.")?;

    Ok(events
        .into_iter()
        .map(|event| EventListing {
            participation: participation.get(&event.id).copied().unwrap_or_default(),
            status: EventStatus::at(event.event_date, now),
            event,
        })
        .collect())
}

pub async fn create(
    backend: &dyn Backend,
    me: Option<&Identity>,
    form: &EventForm,
    now: OffsetDateTime,
) -> Result<(), ActionError> {
    let me = me.ok_or(ActionError::LoginRequired("Please login to create an event."))?;
    let input = form.check(Some(now))?;

    let event = NewEvent {
        title: input.title,
        description: input.description,
        event_date: input.event_date,
        location: input.location,
        max_participants: input.max_participants,
        created_by: me.email.clone(),
        creator_id: me.id,
        image_url: input.image_url,
    };
    backend.insert_event(&event).await.or_fail("Failed to create event.")?;
    info!(creator = %me.email, title = %event.title, "event created");
    Ok(())
}

pub async fn owned(
    backend: &dyn Backend,
    me: Option<&Identity>,
    id: i64,
    denied: &'static str,
) -> Result<Event, ActionError> {
    let me = me.ok_or(ActionError::LoginRequired("Please login."))?;
    let event = backend
        .event(id)
        .await
        .or_fail("Event not found.")?
        .ok_or(ActionError::NotFound("Event not found."))?;
    if event.created_by != me.email {
        return Err(ActionError::Forbidden(denied));
    }
    Ok(event)
}

async fn check_creator(
    backend: &dyn Backend,
    me: &Identity,
    id: i64,
    denied: &'static str,
    failed: &'static str,
) -> Result<(), ActionError> {
    match backend.event_creator(id).await.or_fail(failed)? {
        Some(creator) if creator == me.email => Ok(()),
        _ => Err(ActionError::Forbidden(denied)),
    }
}

/// Unlike creation, an edit may leave the date in the past.
pub async fn edit(backend: &dyn Backend, me: Option<&Identity>, id: i64, form: &EventForm) -> Result<(), ActionError> {
    let me = me.ok_or(ActionError::LoginRequired("Please login."))?;
    let input = form.check(None)?;
    check_creator(backend, me, id, EDIT_DENIED, "Failed to update event.").await?;

    let changes = EventChanges {
        title: input.title,
        description: input.description,
        event_date: input.event_date,
        location: input.location,
        max_participants: input.max_participants,
        image_url: input.image_url,
    };
    backend.update_event(id, &changes).await.or_fail("Failed to update event.")?;
    info!(id, creator = %me.email, "event updated");
    Ok(())
}

/// Participants go with the event.
pub async fn delete(backend: &dyn Backend, me: Option<&Identity>, id: i64) -> Result<(), ActionError> {
    let me = me.ok_or(ActionError::LoginRequired("Please login."))?;
    check_creator(backend, me, id, DELETE_DENIED, "Failed to delete event.").await?;

    backend.delete_event(id).await.or_fail("Failed to delete event.")?;
    info!(id, creator = %me.email, "event deleted");
    Ok(())
}

pub async fn join(backend: &dyn Backend, me: Option<&Identity>, id: i64) -> Result<&'static str, ActionError> {
    let me = me.ok_or(ActionError::LoginRequired("Please login to join events."))?;
    let outcome = backend
        .join_event(id, me.id, &me.email)
        .await
        .or_fail("Failed to join event.")?;

    match outcome {
        JoinOutcome::Joined => {
            info!(id, user = %me.email, "joined event");
            Ok("Successfully joined event!")
        }
        JoinOutcome::AlreadyJoined => Err(ActionError::Rejected("You already joined this event.")),
        JoinOutcome::Full => Err(ActionError::Rejected("Event is full.")),
        JoinOutcome::Missing => Err(ActionError::NotFound("Event not found.")),
    }
}

/// Leaving an event one never joined still succeeds.
pub async fn leave(backend: &dyn Backend, me: Option<&Identity>, id: i64) -> Result<&'static str, ActionError> {
    let me = me.ok_or(ActionError::LoginRequired("Please login."))?;
    backend.leave_event(id, me.id).await.or_fail("Failed to leave event.")?;
    info!(id, user = %me.email, "left event");
    Ok("Successfully left event!")
}
