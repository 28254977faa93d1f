//! Which callers may perform which action on which resource.

use crate::error::{AppError, PERMISSION_DENIED};
use crate::middleware::Caller;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Shows,
    Reservations,
    MovieCatalog,
    ReservationEvents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Privileged,
}

use Access::{Privileged, Public};
use Action::*;
use Resource::*;

const POLICY: &[(Resource, Action, Access)] = &[
    (Shows, List, Public),
    (Shows, Retrieve, Public),
    (Shows, Create, Privileged),
    (Shows, Update, Privileged),
    (Shows, PartialUpdate, Privileged),
    (Shows, Destroy, Privileged),
    (Reservations, List, Public),
    (Reservations, Retrieve, Privileged),
    (Reservations, Create, Privileged),
    (Reservations, Update, Privileged),
    (Reservations, PartialUpdate, Privileged),
    (Reservations, Destroy, Privileged),
    (MovieCatalog, List, Public),
    (MovieCatalog, Retrieve, Public),
    (MovieCatalog, Create, Public),
    (MovieCatalog, Update, Public),
    (MovieCatalog, Destroy, Public),
    (ReservationEvents, List, Public),
    (ReservationEvents, Retrieve, Public),
    (ReservationEvents, Create, Public),
    (ReservationEvents, Update, Public),
    (ReservationEvents, Destroy, Public),
];

/// Pairs missing from the table require a privileged caller.
pub fn required_access(resource: Resource, action: Action) -> Access {
    POLICY
        .iter()
        .find(|(r, a, _)| *r == resource && *a == action)
        .map(|(_, _, access)| *access)
        .unwrap_or(Privileged)
}

pub fn authorize(caller: &Caller, resource: Resource, action: Action) -> Result<(), AppError> {
    match required_access(resource, action) {
        Public => Ok(()),
        Privileged if caller.is_privileged() => Ok(()),
        Privileged => {
            tracing::debug!("Denied {:?} on {:?} for {:?}", action, resource, caller);
            Err(AppError::AuthorizationError(PERMISSION_DENIED.to_string()))
        }
    }
}
