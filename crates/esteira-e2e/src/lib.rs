//! End-to-end tests for the esteira broker live in `tests/`; they spawn the
//! built `esteira-server` binary and drive it over the wire.
