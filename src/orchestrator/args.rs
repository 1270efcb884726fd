// src/orchestrator/args.rs

//! Translation of build requests into buck argument vectors.

use std::path::Path;

/// What a build-like request should do.
///
/// `test` wins over `install` when both are set. `run` and `debug` only
/// matter for installs, and `debug` only when `run` is also set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub install: bool,
    pub test: bool,
    /// Simulator or device identifier passed as `--udid`.
    pub simulator: Option<String>,
    /// Launch the app after installing.
    pub run: bool,
    /// Make the launched app wait for a debugger.
    pub debug: bool,
    /// Appended verbatim after everything else.
    pub extra_args: Vec<String>,
}

impl BuildOptions {
    pub fn subcommand(&self) -> &'static str {
        if self.test {
            "test"
        } else if self.install {
            "install"
        } else {
            "build"
        }
    }
}

/// Argument vector for a build/install/test call.
pub fn build_args(targets: &[String], options: &BuildOptions, report: Option<&Path>) -> Vec<String> {
    let mut args = vec![options.subcommand().to_string()];
    args.extend(targets.iter().cloned());
    args.push("--keep-going".to_string());

    if let Some(path) = report {
        args.push("--build-report".to_string());
        args.push(path.display().to_string());
    }

    if options.install && !options.test {
        if let Some(udid) = &options.simulator {
            args.push("--udid".to_string());
            args.push(udid.clone());
        }
        if options.run {
            args.push("--run".to_string());
            if options.debug {
                args.push("--wait-for-debugger".to_string());
            }
        }
    }

    args.extend(options.extra_args.iter().cloned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plain_build() {
        let args = build_args(&targets(&["//a:a", "//b:b"]), &BuildOptions::default(), None);
        assert_eq!(args, vec!["build", "//a:a", "//b:b", "--keep-going"]);
    }

    #[test]
    fn report_path_follows_keep_going() {
        let args = build_args(
            &targets(&["//a:a"]),
            &BuildOptions::default(),
            Some(Path::new("/tmp/report.json")),
        );
        assert_eq!(
            args,
            vec!["build", "//a:a", "--keep-going", "--build-report", "/tmp/report.json"]
        );
    }

    #[test]
    fn install_with_run_and_debug() {
        let options = BuildOptions {
            install: true,
            simulator: Some("SIM-1".to_string()),
            run: true,
            debug: true,
            extra_args: vec!["-v".to_string(), "2".to_string()],
            ..Default::default()
        };
        let args = build_args(&targets(&["//app:app"]), &options, None);
        assert_eq!(
            args,
            vec![
                "install",
                "//app:app",
                "--keep-going",
                "--udid",
                "SIM-1",
                "--run",
                "--wait-for-debugger",
                "-v",
                "2"
            ]
        );
    }

    #[test]
    fn debug_without_run_is_ignored() {
        let options = BuildOptions {
            install: true,
            debug: true,
            ..Default::default()
        };
        let args = build_args(&targets(&["//app:app"]), &options, None);
        assert_eq!(args, vec!["install", "//app:app", "--keep-going"]);
    }

    #[test]
    fn test_takes_priority_over_install() {
        let options = BuildOptions {
            install: true,
            test: true,
            run: true,
            ..Default::default()
        };
        assert_eq!(options.subcommand(), "test");
        let args = build_args(&targets(&["//t:t"]), &options, None);
        assert_eq!(args, vec!["test", "//t:t", "--keep-going"]);
    }
}
