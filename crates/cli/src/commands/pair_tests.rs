// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn pair_prints_a_url_rooted_at_app_base_url() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("PASEO_HOME", dir.path());

    let config = Config::load().unwrap();
    let identity = DaemonIdentity::load_or_create(&config.daemon_key_path).unwrap();
    let server_id = load_or_create_stable_id(&config.server_id_path).unwrap();
    let url = paseo_daemon::crypto::pairing_offer_url(&config.app_base_url, &server_id, &identity);

    assert!(url.starts_with(&config.app_base_url));
    assert!(url.contains("/pair#"));

    std::env::remove_var("PASEO_HOME");
}
