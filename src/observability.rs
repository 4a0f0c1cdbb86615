use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("clinic_chat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("clinic_chat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("clinic_chat.client.request_duration_seconds");

pub(crate) static COMPLETION_FALLBACKS: Counter =
    Counter::new("clinic_chat.completion.fallbacks");

pub(crate) static SESSION_SUBMISSIONS: Counter = Counter::new("clinic_chat.session.submissions");
pub(crate) static SESSION_IGNORED_EMPTY: Counter =
    Counter::new("clinic_chat.session.ignored_empty");
pub(crate) static SESSION_IGNORED_BUSY: Counter = Counter::new("clinic_chat.session.ignored_busy");
pub(crate) static SESSION_TURN_DURATION: Moments =
    Moments::new("clinic_chat.session.turn_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&COMPLETION_FALLBACKS);

    collector.register_counter(&SESSION_SUBMISSIONS);
    collector.register_counter(&SESSION_IGNORED_EMPTY);
    collector.register_counter(&SESSION_IGNORED_BUSY);
    collector.register_moments(&SESSION_TURN_DURATION);
}
