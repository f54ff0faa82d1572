use std::sync::{Mutex, MutexGuard, PoisonError};

use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::session::{SessionStore, Slot};

pub const ACCESS_COOKIE_NAME: &str = "__relay_access";
pub const REFRESH_COOKIE_NAME: &str = "__relay_refresh";
pub const ACCEPTED_COOKIE_NAME: &str = "__relay_accepted";

fn cookie_name(slot: Slot) -> &'static str {
    match slot {
        Slot::Access => ACCESS_COOKIE_NAME,
        Slot::Refresh => REFRESH_COOKIE_NAME,
        Slot::AcceptedTerms => ACCEPTED_COOKIE_NAME,
    }
}

/// Build the cookie for a slot.
///
/// Credentials are http-only; the accepted-terms flag is readable by pages.
/// Only the access credential carries a max-age.
pub(super) fn slot_cookie(
    slot: Slot,
    value: &str,
    ttl: Option<std::time::Duration>,
    secure: bool,
) -> Cookie<'static> {
    let mut builder = Cookie::build((cookie_name(slot), value.to_string()))
        .same_site(SameSite::Lax)
        .path("/");

    builder = match slot {
        Slot::Access | Slot::Refresh => builder.http_only(true).secure(secure),
        Slot::AcceptedTerms => builder.http_only(false),
    };

    if let Some(ttl) = ttl {
        builder = builder.max_age(Duration::try_from(ttl).unwrap_or(Duration::MAX));
    }
    builder.build()
}

/// Create removal cookie for a slot.
pub(super) fn clear_slot_cookie(slot: Slot) -> Cookie<'static> {
    Cookie::build((cookie_name(slot), ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// [`SessionStore`] backed by the request's private (encrypted) cookie jar.
///
/// Writes go into the jar; hand it back with the response via
/// [`into_jar`](CookieSessionStore::into_jar) so the browser receives them.
pub struct CookieSessionStore {
    jar: Mutex<PrivateCookieJar>,
    secure: bool,
}

impl CookieSessionStore {
    #[must_use]
    pub fn new(jar: PrivateCookieJar, secure: bool) -> Self {
        Self {
            jar: Mutex::new(jar),
            secure,
        }
    }

    #[must_use]
    pub fn into_jar(self) -> PrivateCookieJar {
        self.jar.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, PrivateCookieJar> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for CookieSessionStore {
    fn get(&self, slot: Slot) -> Option<String> {
        self.lock()
            .get(cookie_name(slot))
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn set(&self, slot: Slot, value: &str, ttl: Option<std::time::Duration>) {
        let mut jar = self.lock();
        *jar = jar.clone().add(slot_cookie(slot, value, ttl, self.secure));
    }

    fn delete(&self, slot: Slot) {
        let mut jar = self.lock();
        *jar = jar.clone().remove(clear_slot_cookie(slot));
    }

    fn clear(&self) {
        let mut jar = self.lock();
        *jar = Slot::ALL
            .into_iter()
            .fold(jar.clone(), |jar, slot| jar.remove(clear_slot_cookie(slot)));
    }
}
