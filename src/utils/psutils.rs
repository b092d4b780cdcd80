use std::collections::HashMap;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};
use users::{Users, UsersCache};

pub const UNKNOWN: &str = "unknown";

/// Processes sharing a user and application name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessGroup {
    pub user: String,
    pub application: String,
    pub pids: Vec<usize>,
}

pub fn resolve_username(uid: u32, users_cache: &UsersCache) -> String {
    users_cache
        .get_user_by_uid(uid)
        .map(|user| user.name().to_string_lossy().to_string())
        .unwrap_or_else(|| uid.to_string())
}

pub fn resolve_group_name(name: &str) -> String {
    name.split('/').next().unwrap_or(UNKNOWN).to_string()
}

/// Group the given pids by (user, application).
///
/// Pids that are gone from the process table are grouped under
/// ("unknown", "unknown"). Output is sorted by user then application.
pub fn collect_process_groups(pids: &[usize]) -> Vec<ProcessGroup> {
    if pids.is_empty() {
        return Vec::new();
    }

    let targets: Vec<Pid> = pids.iter().map(|&pid| Pid::from(pid)).collect();
    let mut system = System::new_with_specifics(RefreshKind::nothing());
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&targets),
        true,
        ProcessRefreshKind::everything(),
    );
    let users_cache = UsersCache::new();

    let mut groups: HashMap<(String, String), Vec<usize>> = HashMap::new();
    for &pid in pids {
        let key = match system.process(Pid::from(pid)) {
            Some(process) => {
                let user = process
                    .user_id()
                    .map(|uid| resolve_username(**uid, &users_cache))
                    .unwrap_or_else(|| UNKNOWN.to_string());
                let app = resolve_group_name(&process.name().to_string_lossy());
                (user, app)
            }
            None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
        };
        let members = groups.entry(key).or_default();
        if !members.contains(&pid) {
            members.push(pid);
        }
    }

    let mut process_groups: Vec<ProcessGroup> = groups
        .into_iter()
        .map(|((user, application), mut pids)| {
            pids.sort_unstable();
            ProcessGroup { user, application, pids }
        })
        .collect();
    process_groups.sort_by(|a, b| (&a.user, &a.application).cmp(&(&b.user, &b.application)));
    process_groups
}
