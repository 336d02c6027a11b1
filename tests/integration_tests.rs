//! Integration tests for depcheck
//!
//! These tests drive full resolution passes through `build_checker` with
//! in-memory registry, git and solver fakes.

mod common;

use common::{init_test_logging, inputs, manifest, CeilingResolver, StaticGit, StaticRegistry};
use depcheck::domain::{
    Dependency, GitSource, LatestVersion, Requirement, RequirementsUpdateStrategy, SecurityAdvisory, Source,
    UnlockScope, Version,
};
use depcheck::{build_checker, CheckError, CheckerInputs, UpdateChecker};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn composer(inputs: CheckerInputs) -> UpdateChecker {
    init_test_logging();
    build_checker("composer", inputs).unwrap()
}

fn registry_dependency(name: &str, version: Option<&str>, requirement: &str) -> Dependency {
    Dependency::new(
        name,
        version,
        vec![Requirement::new(requirement, "composer.json")],
        "composer",
    )
}

fn git_dependency(version: &str, reference: Option<&str>) -> Dependency {
    let mut source = GitSource::branch("https://github.com/acme/widgets", "main");
    if let Some(reference) = reference {
        source = source.with_ref(reference);
    }
    Dependency::new(
        "acme/widgets",
        Some(version),
        vec![Requirement::new("dev-main", "composer.json").with_source(Source::Git(source))],
        "composer",
    )
}

mod path_dependencies {
    use super::*;

    /// Every question is unanswered when any requirement has a path source
    #[tokio::test]
    async fn test_path_source_answers_nothing() {
        let dependency = Dependency::new(
            "acme/local",
            Some("1.0.0"),
            vec![
                Requirement::new("^1.0", "composer.json").with_source(Source::Path {
                    path: "../local".to_string(),
                }),
                Requirement::new("dev-main", "composer.json").with_source(Source::Git(GitSource::branch(
                    "https://github.com/acme/local",
                    "main",
                ))),
            ],
            "composer",
        );
        let registry = Arc::new(StaticRegistry::new().with_versions("acme/local", &["1.0.0", "1.1.0"]));
        let git = Arc::new(StaticGit::new().with_head("main", "ffffffffffffffffffffffffffffffffffffffff"));
        let resolver = Arc::new(CeilingResolver::new(Some("1.1.0"), Some("1.1.0")));

        let mut inputs = inputs(dependency, registry.clone(), git.clone(), resolver.clone());
        inputs.advisories = vec![SecurityAdvisory::new("acme/local", ["<1.1.0"], ["1.1.0"]).unwrap()];
        let checker = composer(inputs);

        assert_eq!(checker.latest_version().await.unwrap(), None);
        assert_eq!(checker.latest_resolvable_version().await.unwrap(), None);
        assert_eq!(checker.latest_resolvable_version_with_no_unlock().await.unwrap(), None);
        assert_eq!(checker.lowest_security_fix_version().await.unwrap(), None);
        assert_eq!(checker.lowest_resolvable_security_fix_version().await.unwrap(), None);
        assert!(!checker.can_update(UnlockScope::Own).await.unwrap());
        assert!(checker.updated_dependency(UnlockScope::Own).await.unwrap().is_none());

        assert_eq!(registry.calls.load(Ordering::SeqCst), 0);
        assert_eq!(git.calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.call_count(), 0);
    }
}

mod git_dependencies {
    use super::*;

    const OLD: &str = "1111111111111111111111111111111111111111";
    const HEAD: &str = "2222222222222222222222222222222222222222";

    #[tokio::test]
    async fn test_branch_latest_is_head() {
        let git = Arc::new(StaticGit::new().with_head("main", HEAD));
        let checker = composer(inputs(
            git_dependency(OLD, None),
            Arc::new(StaticRegistry::new()),
            git.clone(),
            Arc::new(CeilingResolver::new(None, None)),
        ));

        assert_eq!(
            checker.latest_version().await.unwrap(),
            Some(LatestVersion::Revision(HEAD.to_string()))
        );
        assert!(!checker.up_to_date().await.unwrap());
        assert!(checker.can_update(UnlockScope::Own).await.unwrap());

        let updated = checker.updated_dependency(UnlockScope::Own).await.unwrap().unwrap();
        assert_eq!(updated.version.as_deref(), Some(HEAD));
        assert_eq!(updated.previous_version.as_deref(), Some(OLD));
        assert!(!updated.requirements_changed());

        assert_eq!(git.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_branch_at_head_is_up_to_date() {
        let checker = composer(inputs(
            git_dependency(HEAD, None),
            Arc::new(StaticRegistry::new()),
            Arc::new(StaticGit::new().with_head("main", HEAD)),
            Arc::new(CeilingResolver::new(None, None)),
        ));
        assert!(checker.up_to_date().await.unwrap());
        assert!(!checker.can_update(UnlockScope::Own).await.unwrap());
    }

    #[tokio::test]
    async fn test_opaque_tag_keeps_current_version() {
        let git = Arc::new(StaticGit::new().with_head("main", HEAD).with_tag("stable", HEAD));
        let checker = composer(inputs(
            git_dependency(OLD, Some("stable")),
            Arc::new(StaticRegistry::new()),
            git.clone(),
            Arc::new(CeilingResolver::new(None, None)),
        ));

        assert_eq!(
            checker.latest_version().await.unwrap(),
            Some(LatestVersion::Revision(OLD.to_string()))
        );
        assert!(checker.up_to_date().await.unwrap());
        assert!(checker.updated_dependency(UnlockScope::Own).await.unwrap().is_none());
        assert_eq!(git.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_version_tag_moves_to_newer_tag() {
        let git = Arc::new(
            StaticGit::new()
                .with_tag("v1.0.0", OLD)
                .with_tag("v1.1.0", HEAD)
                .with_tag("v2.0.0-rc1", "3333333333333333333333333333333333333333"),
        );
        let checker = composer(inputs(
            git_dependency(OLD, Some("v1.0.0")),
            Arc::new(StaticRegistry::new()),
            git,
            Arc::new(CeilingResolver::new(None, None)),
        ));

        assert_eq!(
            checker.latest_version().await.unwrap(),
            Some(LatestVersion::Revision(HEAD.to_string()))
        );
    }

    #[tokio::test]
    async fn test_git_dependency_skips_resolver() {
        let resolver = Arc::new(CeilingResolver::new(Some("9.0.0"), Some("9.0.0")));
        let checker = composer(inputs(
            git_dependency(OLD, None),
            Arc::new(StaticRegistry::new()),
            Arc::new(StaticGit::new().with_head("main", HEAD)),
            resolver.clone(),
        ));
        assert_eq!(checker.latest_resolvable_version().await.unwrap(), None);
        assert_eq!(checker.latest_resolvable_version_with_no_unlock().await.unwrap(), None);
        assert_eq!(resolver.call_count(), 0);
    }
}

mod transient_failures {
    use super::*;
    use depcheck::error::{GitError, RegistryError};

    #[tokio::test]
    async fn test_registry_outage_propagates() {
        let registry = Arc::new(StaticRegistry::offline());
        let resolver = Arc::new(CeilingResolver::new(Some("1.2.0"), Some("1.2.0")));
        let checker = composer(inputs(
            registry_dependency("acme/widgets", Some("1.0.0"), "^1.0"),
            registry.clone(),
            Arc::new(StaticGit::new()),
            resolver.clone(),
        ));

        assert!(matches!(
            checker.latest_version().await,
            Err(CheckError::Registry(RegistryError::NetworkError { ref package, .. })) if package == "acme/widgets"
        ));
        assert!(matches!(
            checker.can_update(UnlockScope::Own).await,
            Err(CheckError::Registry(RegistryError::NetworkError { .. }))
        ));
        assert!(matches!(
            checker.updated_dependency(UnlockScope::Own).await,
            Err(CheckError::Registry(_))
        ));

        // no fallback to the solver when the listing could not be fetched
        assert_eq!(resolver.call_count(), 0);
        assert!(registry.calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_git_outage_propagates() {
        let checker = composer(inputs(
            git_dependency("1111111111111111111111111111111111111111", None),
            Arc::new(StaticRegistry::new()),
            Arc::new(StaticGit::unreachable()),
            Arc::new(CeilingResolver::new(None, None)),
        ));

        assert!(matches!(
            checker.latest_version().await,
            Err(CheckError::Git(GitError::CommandFailed { ref url, .. })) if url == "https://github.com/acme/widgets"
        ));
        assert!(checker.up_to_date().await.is_err());
    }
}

mod security_fixes {
    use super::*;

    const LISTING: &[&str] = &[
        "1.0.0", "1.0.1", "1.0.2", "1.1.0", "1.1.1", "1.2.0", "2.0.0-beta1", "2.0.0",
    ];

    /// Smallest listed stable release above `current` outside every range and
    /// at or above every advisory's lowest fix
    fn expected_fix(current: &Version, advisories: &[SecurityAdvisory]) -> Option<Version> {
        LISTING
            .iter()
            .map(|v| Version::parse(v).unwrap())
            .filter(|v| !v.is_prerelease() && v > current)
            .filter(|v| {
                advisories.iter().all(|a| {
                    !a.vulnerable_ranges.iter().any(|r| r.matches(v))
                        && a.fixed_versions.iter().min().is_none_or(|fixed| v >= fixed)
                })
            })
            .min()
    }

    #[tokio::test]
    async fn test_lowest_fix_is_minimal_and_outside_ranges() {
        let cases: Vec<(&str, Vec<SecurityAdvisory>)> = vec![
            (
                "1.0.0",
                vec![SecurityAdvisory::new(
                    "acme/widgets",
                    [">=1.0.0 <1.0.2", ">=1.1.0 <1.1.1"],
                    ["1.0.2", "1.1.1"],
                )
                .unwrap()],
            ),
            (
                "1.1.0",
                vec![SecurityAdvisory::new(
                    "acme/widgets",
                    [">=1.0.0 <1.0.2", ">=1.1.0 <1.1.1"],
                    ["1.0.2", "1.1.1"],
                )
                .unwrap()],
            ),
            (
                "1.0.0",
                vec![SecurityAdvisory::new("acme/widgets", ["<2.0.0"], ["2.0.0"]).unwrap()],
            ),
            (
                "1.0.0",
                vec![
                    SecurityAdvisory::new("acme/widgets", ["<1.0.2"], ["1.0.2"]).unwrap(),
                    SecurityAdvisory::new("acme/widgets", [">=1.0.0 <1.1.0"], ["1.1.0"]).unwrap(),
                ],
            ),
        ];

        for (current, advisories) in cases {
            let mut inputs = inputs(
                registry_dependency("acme/widgets", Some(current), "^1.0"),
                Arc::new(StaticRegistry::new().with_versions("acme/widgets", LISTING)),
                Arc::new(StaticGit::new()),
                Arc::new(CeilingResolver::new(Some("2.0.0"), Some("1.2.0"))),
            );
            inputs.advisories = advisories.clone();
            let checker = composer(inputs);

            let fix = checker.lowest_security_fix_version().await.unwrap();
            let current = Version::parse(current).unwrap();
            assert_eq!(fix, expected_fix(&current, &advisories), "current {}", current);

            let fix = fix.unwrap();
            for advisory in &advisories {
                assert!(
                    !advisory.vulnerable_ranges.iter().any(|r| r.matches(&fix)),
                    "{} is inside a vulnerable range",
                    fix
                );
            }
        }
    }

    #[tokio::test]
    async fn test_resolvable_fix_is_preferred() {
        let mut inputs = inputs(
            registry_dependency("acme/widgets", Some("1.0.0"), "^1.0"),
            Arc::new(StaticRegistry::new().with_versions("acme/widgets", LISTING)),
            Arc::new(StaticGit::new()),
            Arc::new(CeilingResolver::new(Some("1.2.0"), Some("1.0.0"))),
        );
        inputs.advisories = vec![SecurityAdvisory::new("acme/widgets", ["<1.0.2"], ["1.0.2"]).unwrap()];
        let checker = composer(inputs);

        assert!(checker.vulnerable());
        assert_eq!(
            checker.lowest_resolvable_security_fix_version().await.unwrap(),
            Some(Version::new(1, 0, 2))
        );

        let updated = checker.updated_dependency(UnlockScope::Own).await.unwrap().unwrap();
        assert_eq!(updated.version.as_deref(), Some("1.0.2"));
        assert_eq!(updated.requirements[0].requirement.as_deref(), Some("^1.0"));
    }

    #[tokio::test]
    async fn test_not_vulnerable_is_an_error() {
        let mut patched = inputs(
            registry_dependency("acme/widgets", Some("1.3.0"), "^1.3"),
            Arc::new(StaticRegistry::new().with_versions("acme/widgets", &["1.3.0"])),
            Arc::new(StaticGit::new()),
            Arc::new(CeilingResolver::new(Some("1.3.0"), Some("1.3.0"))),
        );
        patched.advisories = vec![SecurityAdvisory::new("acme/widgets", ["<1.2.5"], ["1.2.5"]).unwrap()];
        let checker = composer(patched);
        assert!(matches!(
            checker.lowest_resolvable_security_fix_version().await,
            Err(CheckError::NotVulnerable { ref dependency }) if dependency == "acme/widgets"
        ));

        let unrelated = inputs(
            registry_dependency("acme/widgets", Some("1.0.0"), "^1.0"),
            Arc::new(StaticRegistry::new().with_versions("acme/widgets", &["1.0.0"])),
            Arc::new(StaticGit::new()),
            Arc::new(CeilingResolver::new(Some("1.0.0"), Some("1.0.0"))),
        );
        let checker = composer(unrelated);
        assert!(matches!(
            checker.lowest_resolvable_security_fix_version().await,
            Err(CheckError::NotVulnerable { .. })
        ));
    }
}

mod strategy {
    use super::*;

    fn checker_with_manifest(content: depcheck::domain::DependencyFile) -> UpdateChecker {
        let mut inputs = inputs(
            registry_dependency("acme/widgets", Some("1.0.0"), "^1.0"),
            Arc::new(StaticRegistry::new()),
            Arc::new(StaticGit::new()),
            Arc::new(CeilingResolver::new(None, None)),
        );
        inputs.files = vec![content];
        composer(inputs)
    }

    #[test]
    fn test_library_widens_ranges() {
        let checker = checker_with_manifest(manifest("library"));
        assert!(checker.library().unwrap());
        assert_eq!(
            checker.requirements_update_strategy().unwrap(),
            RequirementsUpdateStrategy::WidenRanges
        );
        assert!(checker.requirements_unlocked_or_can_be().unwrap());
    }

    #[test]
    fn test_other_types_bump_if_necessary() {
        for package_type in ["project", "metapackage", "composer-plugin"] {
            let checker = checker_with_manifest(manifest(package_type));
            assert_eq!(
                checker.requirements_update_strategy().unwrap(),
                RequirementsUpdateStrategy::BumpVersionsIfNecessary
            );
        }

        let untyped = checker_with_manifest(depcheck::domain::DependencyFile::new(
            "composer.json",
            r#"{"name": "acme/app"}"#,
        ));
        assert_eq!(
            untyped.requirements_update_strategy().unwrap(),
            RequirementsUpdateStrategy::BumpVersionsIfNecessary
        );
    }

    #[test]
    fn test_update_contract_per_strategy() {
        use depcheck::requirement::update;

        let reqs = vec![
            Requirement::new("^1.2", "composer.json"),
            Requirement::new(">=1.0 <2.0", "composer.json"),
        ];
        let target = Version::parse("2.1.0").unwrap();
        let rewritten = |strategy| -> Vec<String> {
            update(&reqs, Some(&target), strategy)
                .into_iter()
                .map(|r| r.requirement.unwrap())
                .collect()
        };

        assert_eq!(rewritten(RequirementsUpdateStrategy::LockfileOnly), vec!["^1.2", ">=1.0 <2.0"]);
        assert_eq!(rewritten(RequirementsUpdateStrategy::WidenRanges), vec!["^1.2 || ^2.1", ">=1.0 <3.0"]);
        assert_eq!(rewritten(RequirementsUpdateStrategy::BumpVersions), vec!["^2.1", ">=2.1 <3.0"]);
        assert_eq!(
            rewritten(RequirementsUpdateStrategy::BumpVersionsIfNecessary),
            vec!["^2.1", ">=2.1 <3.0"]
        );
    }
}

mod scenarios {
    use super::*;

    /// Registry knows 2.0.0 but the solver only accepts 1.3.0
    fn foo_inputs(resolver: Arc<CeilingResolver>) -> CheckerInputs {
        inputs(
            registry_dependency("foo", None, "^1.2.0"),
            Arc::new(StaticRegistry::new().with_versions("foo", &["1.2.0", "1.3.0", "2.0.0"])),
            Arc::new(StaticGit::new()),
            resolver,
        )
    }

    #[tokio::test]
    async fn test_foo_scenario() {
        let checker = composer(foo_inputs(Arc::new(CeilingResolver::new(Some("1.3.0"), None))));

        assert_eq!(
            checker.latest_version().await.unwrap(),
            Some(LatestVersion::Release(Version::new(2, 0, 0)))
        );
        assert_eq!(checker.latest_resolvable_version().await.unwrap(), Some(Version::new(1, 3, 0)));
        assert_eq!(
            checker.requirements_update_strategy().unwrap(),
            RequirementsUpdateStrategy::BumpVersionsIfNecessary
        );

        let requirements = checker.updated_requirements().await.unwrap();
        assert_eq!(requirements[0].requirement.as_deref(), Some("^1.3.0"));

        assert!(checker.can_update(UnlockScope::Own).await.unwrap());
        let updated = checker.updated_dependency(UnlockScope::Own).await.unwrap().unwrap();
        assert_eq!(updated.version.as_deref(), Some("1.3.0"));
        assert!(updated.requirements_changed());
    }

    #[tokio::test]
    async fn test_same_inputs_same_answers() {
        async fn answers(checker: &UpdateChecker) -> String {
            format!(
                "{:?} {:?} {:?} {:?} {:?}",
                checker.latest_version().await.unwrap(),
                checker.latest_resolvable_version().await.unwrap(),
                checker.latest_resolvable_version_with_no_unlock().await.unwrap(),
                checker.updated_requirements().await.unwrap(),
                checker.updated_dependency(UnlockScope::Own).await.unwrap(),
            )
        }

        let resolver = Arc::new(CeilingResolver::new(Some("1.3.0"), None));
        let first = composer(foo_inputs(resolver.clone()));
        let second = composer(foo_inputs(Arc::new(CeilingResolver::new(Some("1.3.0"), None))));

        let expected = answers(&first).await;
        assert_eq!(answers(&second).await, expected);

        // a second round on the same pass is served from its cache
        let calls = resolver.call_count();
        assert_eq!(answers(&first).await, expected);
        assert_eq!(resolver.call_count(), calls);
    }

    #[tokio::test]
    async fn test_unknown_ecosystem_is_configuration_error() {
        let inputs = foo_inputs(Arc::new(CeilingResolver::new(None, None)));
        let err = build_checker("bundler", inputs).err().unwrap();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_full_unlock_is_not_implemented() {
        let checker = composer(foo_inputs(Arc::new(CeilingResolver::new(Some("1.3.0"), None))));
        assert!(!checker.latest_version_resolvable_with_full_unlock());
        assert!(matches!(
            checker.updated_dependency(UnlockScope::Full).await,
            Err(CheckError::NotImplemented { .. })
        ));
        assert!(matches!(
            checker.updated_dependencies_after_full_unlock(),
            Err(CheckError::NotImplemented { .. })
        ));
    }
}

mod policy {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use depcheck::update::{CooldownOptions, VersionInfo};
    use depcheck::CheckerConfig;

    #[tokio::test]
    async fn test_ignored_versions() {
        let mut ignoring = inputs(
            registry_dependency("acme/widgets", Some("1.3.0"), "^1.3"),
            Arc::new(StaticRegistry::new().with_versions("acme/widgets", &["1.3.0", "2.0.0"])),
            Arc::new(StaticGit::new()),
            Arc::new(CeilingResolver::new(Some("2.0.0"), Some("1.3.0"))),
        );
        ignoring.config = CheckerConfig::new().with_ignored_versions(vec![">=2.0".to_string()]);
        let checker = composer(ignoring);
        assert_eq!(
            checker.latest_version().await.unwrap(),
            Some(LatestVersion::Release(Version::new(1, 3, 0)))
        );
        assert!(checker.up_to_date().await.unwrap());
    }

    #[tokio::test]
    async fn test_all_versions_ignored_raises() {
        let mut ignoring = inputs(
            registry_dependency("acme/widgets", Some("1.3.0"), "^1.3"),
            Arc::new(StaticRegistry::new().with_versions("acme/widgets", &["1.3.0", "2.0.0"])),
            Arc::new(StaticGit::new()),
            Arc::new(CeilingResolver::new(Some("2.0.0"), Some("1.3.0"))),
        );
        ignoring.config = CheckerConfig::new()
            .with_ignored_versions(vec![">=2.0".to_string()])
            .with_raise_on_ignored(true);
        let checker = composer(ignoring);
        assert!(matches!(
            checker.latest_version().await,
            Err(CheckError::AllVersionsIgnored { .. })
        ));
    }

    #[tokio::test]
    async fn test_cooldown_holds_back_fresh_release() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let listing = vec![
            VersionInfo::new("1.1.0", now - Duration::days(90)),
            VersionInfo::new("1.2.0", now - Duration::days(30)),
            VersionInfo::new("1.3.0", now - Duration::days(1)),
        ];
        let mut cooling = inputs(
            registry_dependency("acme/widgets", Some("1.1.0"), "^1.1"),
            Arc::new(StaticRegistry::new().with_listing("acme/widgets", listing)),
            Arc::new(StaticGit::new()),
            Arc::new(CeilingResolver::new(Some("1.3.0"), Some("1.3.0"))),
        );
        cooling.config = CheckerConfig::new().with_cooldown(CooldownOptions::new(7));
        let checker = composer(cooling).with_time(now);

        assert_eq!(
            checker.latest_version().await.unwrap(),
            Some(LatestVersion::Release(Version::new(1, 2, 0)))
        );
        assert_eq!(checker.latest_resolvable_version().await.unwrap(), Some(Version::new(1, 2, 0)));
    }

    #[test]
    fn test_config_from_json() {
        let config: CheckerConfig = serde_json::from_str(
            r#"{
                "ignored_versions": [">=3.0"],
                "raise_on_ignored": true,
                "requirements_update_strategy": "widen_ranges",
                "cooldown": {"default_days": 3, "exclude": ["acme/*"]},
                "resolver_timeout": 60
            }"#,
        )
        .unwrap();

        assert_eq!(config.ignored_versions, vec![">=3.0".to_string()]);
        assert!(config.raise_on_ignored);
        assert_eq!(
            config.requirements_update_strategy,
            Some(RequirementsUpdateStrategy::WidenRanges)
        );
        let cooldown = config.cooldown.unwrap();
        assert_eq!(cooldown.default_days, 3);
        assert!(!cooldown.applies_to("acme/widgets"));
        assert_eq!(config.resolver_timeout, std::time::Duration::from_secs(60));
    }
}
