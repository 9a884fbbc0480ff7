pub mod orders;
pub mod payments;
pub mod webhooks;

use crate::application::side_effects::NonCriticalTasks;

/// Run follow-up work on the blocking pool. The caller does not wait for it;
/// outcomes only reach the log.
pub(crate) fn dispatch(tasks: NonCriticalTasks) {
    if tasks.is_empty() {
        return;
    }
    let names = tasks.names();
    actix_web::rt::task::spawn_blocking(move || {
        let report = tasks.run();
        if report.all_succeeded() {
            log::debug!("Follow-ups {:?} completed", report.succeeded);
        } else {
            log::warn!(
                "{} of {} follow-ups failed: {:?}",
                report.failed.len(),
                names.len(),
                report.failed
            );
        }
    });
}
