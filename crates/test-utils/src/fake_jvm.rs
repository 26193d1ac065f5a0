//! A shell script standing in for `java` in end-to-end tests.
//!
//! Point `[global]` at it with `java_cmd = "/bin/sh"` and
//! `java_opts = "<script path>"`: every job then runs as
//! `sh <script> -classpath <cp> <Main> [params...]`. Running the script
//! through `sh` avoids marking freshly written files executable.

use std::path::{Path, PathBuf};

/// Main classes the script understands.
pub mod mains {
    /// Print each argument on its own line, then exit 0.
    pub const ECHO: &str = "Echo";
    /// Print each argument, then stay alive for 30s.
    pub const ECHO_WAIT: &str = "EchoWait";
    /// Print to stderr, then exit 3.
    pub const FAIL: &str = "Fail";
    /// Sleep for the first argument's seconds (default 30).
    pub const SLEEP: &str = "Sleep";
    /// Ignore SIGTERM and run until killed.
    pub const STUBBORN: &str = "Stubborn";
    /// Print `line 1` .. `line N` for N = first argument.
    pub const LINES: &str = "Lines";
    /// Print `JAVA_HOME=...` and `PWD=...`.
    pub const ENV: &str = "Env";
}

pub const FAKE_JVM: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -classpath|-cp) shift 2 ;;
    -*) shift ;;
    *) break ;;
  esac
done

main="$1"
shift

case "$main" in
  Echo)
    for a in "$@"; do echo "$a"; done
    ;;
  EchoWait)
    for a in "$@"; do echo "$a"; done
    exec sleep 30
    ;;
  Fail)
    echo "failing on purpose" >&2
    exit 3
    ;;
  Sleep)
    exec sleep "${1:-30}"
    ;;
  Stubborn)
    trap '' TERM
    echo ready
    while :; do sleep 1; done
    ;;
  Lines)
    i=1
    while [ "$i" -le "$1" ]; do
      echo "line $i"
      i=$((i + 1))
    done
    ;;
  Env)
    echo "JAVA_HOME=$JAVA_HOME"
    echo "PWD=$(pwd)"
    ;;
  *)
    echo "Error: Could not find or load main class $main" >&2
    exit 1
    ;;
esac
"#;

/// Write the script into `dir` and return its path.
pub fn install_fake_jvm(dir: &Path) -> PathBuf {
    let path = dir.join("fake-java.sh");
    std::fs::write(&path, FAKE_JVM).expect("writing fake JVM script");
    path
}
