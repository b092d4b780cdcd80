#![cfg(unix)]

use gpu_pmon::{
    ExecutionError, FrameBufferSample, GpuSampler, GpuSnapshot, NvidiaSmi, SamplerConfig,
    UtilizationMap, UtilizationSample,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tempfile::TempDir;

// Writing an executable while another test forks can fail with ETXTBSY.
static SCRIPT_LOCK: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SCRIPT_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

const PMON_UTIL: &str = "\
# gpu     pid  type    sm   mem   enc   dec   command
# Idx       #   C/G     %     %     %     %   name
    0       -     -     -     -     -     -   -
   10   64756     C     0     0     0     0   pulpf
   11       -     -     -     -     -     -   -
   15 1426541     C    66    26     0     0   python
";

const PMON_FB: &str = "\
# gpu     pid  type    fb   command
# Idx       #   C/G    MB   name
    0       -     -     -   -
   10   38148     C   284   pulpf
   15       -     -     -   -
";

/// A fake nvidia-smi that answers both pmon forms and refuses to run
/// unless all devices were requested.
fn fake_smi(dir: &TempDir) -> PathBuf {
    let body = format!(
        r#"#!/bin/sh
[ "$NVSMI_SHOW_ALL_DEVICES" = "1" ] || {{ echo "devices hidden" >&2; exit 5; }}
case "$*" in
  "pmon -c 1") cat <<'EOF'
{PMON_UTIL}EOF
  ;;
  "pmon -c 1 -s m") cat <<'EOF'
{PMON_FB}EOF
  ;;
  *) echo "unexpected args: $*" >&2; exit 2 ;;
esac
"#
    );
    write_script(dir, "nvidia-smi", &body)
}

fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn sampler_for(path: &PathBuf) -> NvidiaSmi {
    NvidiaSmi::new(SamplerConfig::new(path.to_string_lossy()))
}

#[test_log::test(tokio::test)]
async fn utilization_from_tool_output() {
    let _guard = serial();
    let dir = TempDir::new().unwrap();
    let sampler = sampler_for(&fake_smi(&dir));

    let mut expected = UtilizationMap::new();
    expected
        .entry("64756".to_string())
        .or_default()
        .insert("10".to_string(), UtilizationSample::new("0", "0"));
    expected
        .entry("1426541".to_string())
        .or_default()
        .insert("15".to_string(), UtilizationSample::new("66", "26"));

    assert_eq!(sampler.sample_utilization().await.unwrap(), expected);
}

#[test_log::test(tokio::test)]
async fn frame_buffer_from_tool_output() {
    let _guard = serial();
    let dir = TempDir::new().unwrap();
    let sampler = sampler_for(&fake_smi(&dir));

    let fb = sampler.sample_frame_buffer().await.unwrap();
    assert_eq!(fb.len(), 1);
    assert_eq!(fb["38148"]["10"], FrameBufferSample::new("284"));
}

#[test_log::test(tokio::test)]
async fn hidden_devices_flag_is_honoured() {
    let _guard = serial();
    let dir = TempDir::new().unwrap();
    let path = fake_smi(&dir);
    let sampler = NvidiaSmi::new(
        SamplerConfig::new(path.to_string_lossy()).with_show_all_devices(false),
    );

    // the fake exits 5 when the variable is missing from its environment
    match sampler.sample_utilization().await {
        Err(ExecutionError::NonZeroExit { status, stderr, .. }) => {
            assert_eq!(status.code(), Some(5));
            assert_eq!(stderr, "devices hidden");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test_log::test(tokio::test)]
async fn non_zero_exit_returns_no_data() {
    let _guard = serial();
    let dir = TempDir::new().unwrap();
    let path = write_script(
        &dir,
        "nvidia-smi",
        &format!("#!/bin/sh\ncat <<'EOF'\n{PMON_UTIL}EOF\nexit 9\n"),
    );

    let err = sampler_for(&path).sample_utilization().await.unwrap_err();
    assert!(matches!(err, ExecutionError::NonZeroExit { .. }), "{err:?}");
}

#[test_log::test(tokio::test)]
async fn hung_tool_is_killed_at_timeout() {
    let _guard = serial();
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "nvidia-smi", "#!/bin/sh\nexec sleep 30\n");
    let sampler = NvidiaSmi::new(
        SamplerConfig::new(path.to_string_lossy()).with_timeout(Duration::from_millis(300)),
    );

    let started = Instant::now();
    let err = sampler.sample_frame_buffer().await.unwrap_err();
    assert!(err.is_timeout(), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test_log::test(tokio::test)]
async fn empty_output_is_an_empty_map() {
    let _guard = serial();
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "nvidia-smi", "#!/bin/sh\nexit 0\n");
    let sampler = sampler_for(&path);

    assert!(sampler.sample_utilization().await.unwrap().is_empty());
    assert!(sampler.sample_frame_buffer().await.unwrap().is_empty());
}

#[test_log::test]
fn availability_follows_resolution() {
    let _guard = serial();
    let dir = TempDir::new().unwrap();
    let path = fake_smi(&dir);
    assert!(sampler_for(&path).is_available());

    let not_executable = dir.path().join("plain-file");
    fs::write(&not_executable, "data").unwrap();
    assert!(!sampler_for(&not_executable).is_available());

    let missing = NvidiaSmi::new(SamplerConfig::new("gpu-pmon-no-such-tool-8f3a1"));
    assert!(!missing.is_available());
}

#[test_log::test(tokio::test)]
async fn snapshot_through_the_tool() {
    let _guard = serial();
    let dir = TempDir::new().unwrap();
    let sampler = sampler_for(&fake_smi(&dir));

    let snapshot = GpuSnapshot::capture(&sampler).await.unwrap();
    let rows = snapshot.rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(snapshot.pids(), vec![38148, 64756, 1426541]);
    assert_eq!(snapshot.to_dataframe().unwrap().height(), 3);

    // a second poll is independent and structurally identical
    let again = GpuSnapshot::capture(&sampler).await.unwrap();
    assert_eq!(again.utilization, snapshot.utilization);
    assert_eq!(again.frame_buffer, snapshot.frame_buffer);
}

#[test_log::test(tokio::test)]
async fn snapshot_fails_when_one_query_fails() {
    let _guard = serial();
    let dir = TempDir::new().unwrap();
    let path = write_script(
        &dir,
        "nvidia-smi",
        &format!(
            "#!/bin/sh\n[ \"$*\" = \"pmon -c 1\" ] || exit 4\ncat <<'EOF'\n{PMON_UTIL}EOF\n"
        ),
    );

    let err = GpuSnapshot::capture(&sampler_for(&path)).await.unwrap_err();
    assert!(err.to_string().contains("exited with"), "{err}");
}
