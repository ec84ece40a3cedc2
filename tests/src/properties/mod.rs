//! Property tests.

mod validator_props;
