// Kbfilter Completion Capture
// Snapshots the attribute response once the lower driver completes it

use crate::device::FilterState;
use crate::dispatch::{IoControlCode, Request};
use crate::input::KeyboardAttributes;

/// Run after a forwarded attribute query completes.
///
/// Copies the descriptor into the device's cache when the lower driver
/// succeeded and returned at least a full descriptor. The request's own
/// status is never changed.
pub(crate) fn capture_attributes(state: &FilterState, request: &Request) {
    if !request.io_status.status.is_success()
        || request.control_code != Some(IoControlCode::KeyboardQueryAttributes)
    {
        return;
    }

    if request.io_status.information >= KeyboardAttributes::SIZE {
        if let Some(attributes) = KeyboardAttributes::from_bytes(&request.output) {
            log::debug!(
                "cached keyboard attributes: {} keys, {} indicators",
                attributes.number_of_keys_total,
                attributes.number_of_indicators
            );
            state.store_attributes(attributes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FilterOptions;
    use crate::status::Status;

    fn completed(status: Status, payload: Vec<u8>) -> Request {
        let mut request = Request::query_attributes(KeyboardAttributes::SIZE);
        request.complete(status, payload.len());
        request.output = payload;
        request
    }

    #[test]
    fn test_capture_on_success() {
        let state = FilterState::new(FilterOptions::default());
        let attrs = KeyboardAttributes::enhanced_101();
        let request = completed(Status::Success, attrs.to_bytes().to_vec());

        capture_attributes(&state, &request);
        assert_eq!(state.cached_attributes(), Some(attrs));
    }

    #[test]
    fn test_no_capture_on_downstream_failure() {
        let state = FilterState::new(FilterOptions::default());
        let request = completed(
            Status::Unsuccessful,
            KeyboardAttributes::enhanced_101().to_bytes().to_vec(),
        );

        capture_attributes(&state, &request);
        assert_eq!(state.cached_attributes(), None);
        assert_eq!(request.io_status.status, Status::Unsuccessful);
    }

    #[test]
    fn test_no_capture_on_short_response() {
        let state = FilterState::new(FilterOptions::default());
        let request = completed(Status::Success, vec![0u8; KeyboardAttributes::SIZE - 1]);

        capture_attributes(&state, &request);
        assert_eq!(state.cached_attributes(), None);
    }

    #[test]
    fn test_later_capture_replaces_earlier() {
        let state = FilterState::new(FilterOptions::default());
        let first = KeyboardAttributes::enhanced_101();
        let mut second = first;
        second.number_of_keys_total = 104;

        capture_attributes(&state, &completed(Status::Success, first.to_bytes().to_vec()));
        capture_attributes(&state, &completed(Status::Success, second.to_bytes().to_vec()));
        assert_eq!(state.cached_attributes(), Some(second));
    }
}
