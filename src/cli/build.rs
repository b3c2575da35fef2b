//! `redirkit build`: one full generation.
//!
//! ```text
//! KeyCheck → RecoverPriorState{ok|degraded} → StageOutput → Load
//!          → Reconcile (+carry-over) → PersistPlainState → PersistEncryptedState
//! ```
//!
//! A missing or invalid key, an unreadable template and configuration errors
//! stop the run before the output directory is touched. Everything after
//! staging degrades per item instead of failing the run, with one exception:
//! a run that publishes nothing after failing to read an existing previous
//! state fails, so an output without any mapping is never published.

use anyhow::{Context, Result, bail};

use crate::config::RedirConfig;
use crate::materialize::{Fetch, HttpFetcher, Materializer, RedirectTemplate};
use crate::reconcile::{ReconcileStats, Reconciler, RetiredOutcome};
use crate::request::RequestLoader;
use crate::stage::{SkeletonStage, StageOutput};
use crate::state::{
    GenerationState, PriorState, StateKey, codec, recover_prior_state, write_encrypted_state,
    write_plain_state,
};
use crate::utils::plural_count;
use crate::{debug, log};

/// What a build did, for the final summary.
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub stats: ReconcileStats,
    pub retired: RetiredOutcome,
    /// Prior state could not be recovered; every address was minted fresh.
    pub degraded: bool,
    /// A new mapping was written (false when nothing was published).
    pub persisted: bool,
}

/// Build the output directory from the configured project.
pub fn build_site(config: &RedirConfig, progress: bool) -> Result<()> {
    let key = StateKey::from_env(&config.state.key_env)
        .context("Refusing to build without a valid state key")?;
    let fetcher = HttpFetcher::new(config.timeout(), config.build.retries)
        .context("Failed to create HTTP client")?;

    let summary = run_build(config, &fetcher, &key, progress)?;

    let stats = summary.stats;
    log!(
        "done";
        "published {} ({} reused, {} new), dropped {}",
        plural_count(stats.published(), "redirect"),
        stats.reused,
        stats.minted,
        stats.dropped
    );
    if summary.retired.kept > 0 {
        log!("done"; "kept {} for one more generation", plural_count(summary.retired.kept, "retired artifact"));
    }
    if summary.degraded && summary.persisted {
        log!("warn"; "previous addresses were not recovered, all published addresses are new");
    }
    Ok(())
}

/// Run the state machine with an explicit fetcher and key.
pub fn run_build(
    config: &RedirConfig,
    fetcher: &dyn Fetch,
    key: &StateKey,
    progress: bool,
) -> Result<BuildSummary> {
    let template = RedirectTemplate::load(&config.build.template).with_context(|| {
        format!("Failed to load redirect template: {}", config.build.template.display())
    })?;
    let base_url = config
        .base_url()
        .context("A public base URL is required to build")?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.build.jobs)
        .build()
        .context("Failed to start materializer threads")?;

    let (prior, lost) = match recover(config, fetcher, key) {
        Recovery::Recovered(prior) => (Some(prior), false),
        Recovery::Absent => (None, false),
        Recovery::Lost => (None, true),
    };
    let degraded = prior.is_none();
    let prior_state = prior.as_ref().map(|p| p.state.clone()).unwrap_or_default();

    let output = &config.build.output;
    SkeletonStage::new(&config.build.base).stage(output)?;

    let loader = RequestLoader::scan(&config.build.data);
    debug!("load"; "found {} under {}", plural_count(loader.files().len(), "request document"), config.build.data.display());
    let report = loader.load();
    report.log_warnings();
    log!(
        "load";
        "{} in {}",
        plural_count(report.request_count(), "redirect"),
        plural_count(report.groups.len(), "owner group")
    );

    let materializer = Materializer::new(fetcher, &template);
    let reconciler = Reconciler::new(&materializer, output)
        .with_base_url(&base_url)
        .with_progress(progress);

    let (reconciliation, retired) = pool.install(|| {
        let reconciliation = reconciler.reconcile(&report.groups, &prior_state);
        let retired = if config.build.keep_retired {
            reconciler.carry_over_retired(&prior_state, &reconciliation.state)
        } else {
            RetiredOutcome::default()
        };
        (reconciliation, retired)
    });

    let mut summary = BuildSummary {
        stats: reconciliation.stats,
        retired,
        degraded,
        persisted: false,
    };

    if reconciliation.state.is_empty() {
        if lost {
            bail!(
                "no redirect was published and the previous state could not be recovered, \
                 refusing to leave {} without a mapping",
                output.display()
            );
        }
        preserve_last_known_good(config, prior.as_ref())?;
        return Ok(summary);
    }

    persist(config, &reconciliation.state, key)?;
    summary.persisted = true;
    Ok(summary)
}

/// Where the previous generation stands after a recovery attempt.
enum Recovery {
    Recovered(PriorState),
    /// Nothing was ever published.
    Absent,
    /// A previous state may exist but could not be read.
    Lost,
}

/// Fetch and decrypt the previous generation.
fn recover(config: &RedirConfig, fetcher: &dyn Fetch, key: &StateKey) -> Recovery {
    let Some(url) = config.state_url() else {
        log!("warn"; "no previous state location configured, continuity is lost");
        return Recovery::Absent;
    };
    match recover_prior_state(fetcher, &url, key) {
        Ok(prior) => {
            log!(
                "state";
                "recovered {} from {}",
                plural_count(prior.state.redirect_count(), "redirect"),
                url
            );
            Recovery::Recovered(prior)
        }
        Err(err) => {
            let absent = err.is_absent();
            log!("warn"; "{:#}, starting without previous addresses", anyhow::Error::new(err));
            if absent { Recovery::Absent } else { Recovery::Lost }
        }
    }
}

/// Nothing was published: keep the previous encrypted blob in the output.
fn preserve_last_known_good(config: &RedirConfig, prior: Option<&PriorState>) -> Result<()> {
    log!("warn"; "no redirect was published, leaving the previous mapping in place");
    if let Some(prior) = prior {
        write_encrypted_state(&config.encrypted_state_path(), &prior.blob)?;
        debug!("state"; "republished previous encrypted state");
    }
    Ok(())
}

fn persist(config: &RedirConfig, state: &GenerationState, key: &StateKey) -> Result<()> {
    let blob = codec::encode(state, key).context("Failed to encrypt state")?;
    write_plain_state(&config.build.plain_state, state)?;
    write_encrypted_state(&config.encrypted_state_path(), &blob)?;
    log!("state"; "wrote {}", plural_count(state.group_count(), "owner group"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use crate::materialize::testing::MemoryFetcher;
    use crate::state::PublishedRedirect;
    use std::fs;
    use tempfile::TempDir;

    const STATE_URL: &str = "https://pages.test/encrypted_workflow_ids.json";
    const BANNER: &[u8] = b"\x89PNG banner";

    fn key() -> StateKey {
        StateKey::from_bytes(&[7; 32]).unwrap()
    }

    fn project(requests: Option<&str>) -> (TempDir, RedirConfig) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("templates")).unwrap();
        fs::write(
            root.join("templates/redirect.html"),
            "<meta http-equiv=\"refresh\" content=\"0; url=||redirect_url||\">",
        )
        .unwrap();
        fs::create_dir_all(root.join("gh-pages-base")).unwrap();
        fs::write(root.join("gh-pages-base/CNAME"), "pages.test").unwrap();
        fs::create_dir_all(root.join("data/team")).unwrap();
        if let Some(json) = requests {
            fs::write(root.join("data/team/redirects.json"), json).unwrap();
        }

        let mut config = test_parse_config("[site]\nurl = \"https://pages.test/\"");
        config.root = root.to_path_buf();
        config.build.normalize(root);
        (dir, config)
    }

    const REQUESTS: &str = r#"{"owner_group_id": "team", "redirects": [
        {"url": "https://x.test/banner.png"},
        {"url": "https://x.test/docs"}
    ]}"#;

    fn fetcher() -> MemoryFetcher {
        MemoryFetcher::default().with("https://x.test/banner.png", BANNER)
    }

    fn addresses(state: &GenerationState) -> Vec<String> {
        state.entries().map(|(_, r)| r.address.clone()).collect()
    }

    fn read_encrypted(config: &RedirConfig) -> GenerationState {
        let blob = fs::read(config.encrypted_state_path()).unwrap();
        codec::decode(&blob, &key()).unwrap()
    }

    #[test]
    fn test_first_build_writes_output_and_state() {
        let (_dir, config) = project(Some(REQUESTS));

        let summary = run_build(&config, &fetcher(), &key(), false).unwrap();

        assert!(summary.degraded);
        assert!(summary.persisted);
        assert_eq!(summary.stats.minted, 2);

        let output = &config.build.output;
        assert_eq!(fs::read_to_string(output.join("CNAME")).unwrap(), "pages.test");

        let state = read_encrypted(&config);
        let plain: GenerationState =
            serde_json::from_str(&fs::read_to_string(&config.build.plain_state).unwrap()).unwrap();
        assert_eq!(plain, state);
        for address in addresses(&state) {
            assert!(output.join(address).is_file());
        }
        // Plaintext never lands in the published output
        assert!(!config.build.plain_state.starts_with(output));
    }

    #[test]
    fn test_second_build_keeps_addresses() {
        let (_dir, config) = project(Some(REQUESTS));
        let fetcher = fetcher();
        run_build(&config, &fetcher, &key(), false).unwrap();
        let first = read_encrypted(&config);
        fetcher.insert(STATE_URL, fs::read(config.encrypted_state_path()).unwrap());

        let summary = run_build(&config, &fetcher, &key(), false).unwrap();

        assert!(!summary.degraded);
        assert_eq!(summary.stats.reused, 2);
        assert_eq!(addresses(&read_encrypted(&config)), addresses(&first));
    }

    #[test]
    fn test_undecryptable_prior_state_degrades() {
        let (_dir, config) = project(Some(REQUESTS));
        let mut old = GenerationState::new();
        old.extend_group("team", vec![PublishedRedirect::new("https://x.test/docs", "old/index.html")]);
        let foreign = codec::encode(&old, &StateKey::from_bytes(&[9; 32]).unwrap()).unwrap();
        let fetcher = fetcher().with(STATE_URL, foreign);

        let summary = run_build(&config, &fetcher, &key(), false).unwrap();

        assert!(summary.degraded);
        assert_eq!(summary.stats.reused, 0);
        assert!(!addresses(&read_encrypted(&config)).contains(&"old/index.html".to_string()));
    }

    #[test]
    fn test_zero_redirects_republish_previous_blob() {
        let (_dir, mut config) = project(None);
        config.build.keep_retired = false;
        let mut old = GenerationState::new();
        old.extend_group("team", vec![PublishedRedirect::new("https://x.test/docs", "old/index.html")]);
        let blob = codec::encode(&old, &key()).unwrap();

        let summary = run_build(&config, &fetcher().with(STATE_URL, blob.clone()), &key(), false).unwrap();

        assert!(!summary.persisted);
        assert_eq!(fs::read(config.encrypted_state_path()).unwrap(), blob);
        assert!(!config.build.plain_state.exists());
    }

    #[test]
    fn test_zero_redirects_on_first_run_succeed() {
        let (_dir, config) = project(None);

        let summary = run_build(&config, &fetcher(), &key(), false).unwrap();

        assert!(!summary.persisted);
        assert!(!config.encrypted_state_path().exists());
    }

    #[test]
    fn test_zero_redirects_after_unreadable_state_fail() {
        let (_dir, config) = project(None);
        let fetcher = fetcher().timing_out(STATE_URL);

        assert!(run_build(&config, &fetcher, &key(), false).is_err());
        assert!(!config.encrypted_state_path().exists());
    }

    #[test]
    fn test_missing_key_fails_before_output_is_touched() {
        let (_dir, mut config) = project(Some(REQUESTS));
        config.state.key_env = "REDIRKIT_TEST_KEY_NEVER_SET".to_string();
        fs::create_dir_all(&config.build.output).unwrap();
        fs::write(config.build.output.join("keep.txt"), "previous").unwrap();

        let err = build_site(&config, false).unwrap_err();

        assert!(format!("{err:#}").contains("REDIRKIT_TEST_KEY_NEVER_SET"));
        assert!(config.build.output.join("keep.txt").exists());
    }

    #[test]
    fn test_missing_template_fails_before_output_is_touched() {
        let (dir, config) = project(Some(REQUESTS));
        fs::remove_file(dir.path().join("templates/redirect.html")).unwrap();
        fs::create_dir_all(&config.build.output).unwrap();
        fs::write(config.build.output.join("keep.txt"), "previous").unwrap();

        assert!(run_build(&config, &fetcher(), &key(), false).is_err());
        assert!(config.build.output.join("keep.txt").exists());
    }
}
