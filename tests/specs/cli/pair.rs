//! Pairing command specs
//!
//! Verify `paseo pair` prints a pairing offer URL without requiring a live
//! daemon connection.

use crate::prelude::*;

#[test]
fn pair_prints_a_url_without_a_running_daemon() {
    let env = Env::empty();

    env.paseo()
        .args(&["pair"])
        .passes()
        .stdout_has("/pair#");
}

#[test]
fn pair_is_stable_across_invocations() {
    let env = Env::empty();

    let first = env.paseo().args(&["pair"]).passes().stdout();
    let second = env.paseo().args(&["pair"]).passes().stdout();
    assert_eq!(
        first, second,
        "pairing offer should be stable for a given daemon identity"
    );
}

#[test]
fn pair_json_output_has_server_id_and_url() {
    let env = Env::empty();

    env.paseo()
        .args(&["-o", "json", "pair"])
        .passes()
        .stdout_has("\"server_id\"")
        .stdout_has("\"pairing_url\"");
}
