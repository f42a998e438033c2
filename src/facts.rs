//! Host facts shown on the panel, and the commands/files they come from.

use log::warn;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Upper bound for any single external command.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

const SYS_CLASS_NET: &str = "/sys/class/net";
const IFF_LOOPBACK: u32 = 0x8;
// ARPHRD_* values of tunnel devices: ipip, ip6tnl, sit, ipgre, ip6gre
const TUNNEL_ARP_TYPES: [u32; 5] = [768, 769, 776, 778, 823];

#[derive(Debug, Error)]
pub enum FactError {
    #[error("failed to run `{cmd}`: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: io::Error,
    },
    #[error("`{cmd}` exited with {status}: {stderr}")]
    Failed {
        cmd: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("`{cmd}` timed out after {timeout:?}")]
    TimedOut { cmd: String, timeout: Duration },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unexpected {what}: {text:?}")]
    Parse { what: &'static str, text: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
    pub hostname: String,
    pub os_name: String,
    pub machine: String,
}

impl SystemInfo {
    /// What the build target says, for when `uname` is unavailable.
    pub fn fallback() -> Self {
        Self {
            hostname: "localhost".into(),
            os_name: std::env::consts::OS.into(),
            machine: std::env::consts::ARCH.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UptimeInfo {
    pub text: String,
    /// 1, 5 and 15 minute load averages.
    pub load: [f64; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LinkKind {
    /// Plain device with no link type of its own.
    #[default]
    Unset,
    Tunnel,
    Bond,
    BondSlave,
    /// Any other virtual device (bridge, vlan, veth, ...).
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub loopback: bool,
    pub kind: LinkKind,
    pub oper_state: String,
    pub ipv4: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolRecord {
    pub name: String,
    pub size: String,
    pub allocated: String,
    pub health: String,
}

/// Everything the pages need. Implemented against the live host by
/// [`HostFacts`].
pub trait FactSource {
    fn system(&self) -> Result<SystemInfo, FactError>;
    fn appliance_version(&self) -> Result<String, FactError>;
    fn uptime(&self) -> Result<UptimeInfo, FactError>;
    /// In discovery (ifindex) order.
    fn interfaces(&self) -> Result<Vec<InterfaceInfo>, FactError>;
    fn pools(&self) -> Result<Vec<PoolRecord>, FactError>;
}

/// One poll's worth of facts. Failed queries are logged and replaced by
/// defaults, so gathering itself never fails.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub system: SystemInfo,
    pub version: String,
    pub uptime: UptimeInfo,
    pub interfaces: Vec<InterfaceInfo>,
    pub pools: Vec<PoolRecord>,
}

impl Snapshot {
    pub fn gather(source: &dyn FactSource) -> Self {
        Self {
            system: or_default("system info", source.system(), SystemInfo::fallback),
            version: or_default("appliance version", source.appliance_version(), || {
                "unknown".to_string()
            }),
            uptime: or_default("uptime", source.uptime(), || UptimeInfo {
                text: "?".into(),
                load: [0.0; 3],
            }),
            interfaces: or_default("interfaces", source.interfaces(), Vec::new),
            pools: or_default("pools", source.pools(), Vec::new),
        }
    }
}

fn or_default<T>(what: &str, res: Result<T, FactError>, default: impl FnOnce() -> T) -> T {
    res.unwrap_or_else(|e| {
        warn!("{}: {}", what, e);
        default()
    })
}

// ---- Host implementation ----

pub struct HostFacts {
    timeout: Duration,
    sys_net: PathBuf,
}

impl Default for HostFacts {
    fn default() -> Self {
        Self::new()
    }
}

impl HostFacts {
    pub fn new() -> Self {
        Self {
            timeout: COMMAND_TIMEOUT,
            sys_net: PathBuf::from(SYS_CLASS_NET),
        }
    }

    fn ipv4_addresses(&self) -> Vec<(String, String)> {
        match run_command("ip", &["-4", "-o", "addr", "show"], self.timeout) {
            Ok(out) => parse_ipv4_addrs(&out),
            Err(e) => {
                warn!("listing addresses: {}", e);
                Vec::new()
            }
        }
    }
}

impl FactSource for HostFacts {
    fn system(&self) -> Result<SystemInfo, FactError> {
        let out = run_command("uname", &["-snm"], self.timeout)?;
        parse_uname(&out)
    }

    fn appliance_version(&self) -> Result<String, FactError> {
        run_command("cli", &["-c", "system version"], self.timeout)
    }

    fn uptime(&self) -> Result<UptimeInfo, FactError> {
        let secs = parse_proc_uptime(&read_trimmed(Path::new("/proc/uptime"))?)?;
        let load = parse_loadavg(&read_trimmed(Path::new("/proc/loadavg"))?)?;
        Ok(UptimeInfo {
            text: format_uptime(secs),
            load,
        })
    }

    fn interfaces(&self) -> Result<Vec<InterfaceInfo>, FactError> {
        let addrs = self.ipv4_addresses();
        let entries = fs::read_dir(&self.sys_net).map_err(|source| FactError::Read {
            path: self.sys_net.clone(),
            source,
        })?;

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let dir = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let ifindex = read_trimmed(&dir.join("ifindex"))
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(u32::MAX);
            let flags = read_trimmed(&dir.join("flags"))
                .ok()
                .and_then(|s| u32::from_str_radix(s.trim_start_matches("0x"), 16).ok())
                .unwrap_or(0);
            let oper_state =
                read_trimmed(&dir.join("operstate")).unwrap_or_else(|_| "unknown".into());
            let ipv4 = addrs
                .iter()
                .find(|(dev, _)| *dev == name)
                .map(|(_, addr)| addr.clone());
            found.push((
                ifindex,
                InterfaceInfo {
                    kind: link_kind(&dir),
                    loopback: flags & IFF_LOOPBACK != 0,
                    name,
                    oper_state,
                    ipv4,
                },
            ));
        }
        found.sort_by_key(|(ifindex, _)| *ifindex);
        Ok(found.into_iter().map(|(_, info)| info).collect())
    }

    fn pools(&self) -> Result<Vec<PoolRecord>, FactError> {
        let out = run_command(
            "zpool",
            &["list", "-H", "-o", "name,size,allocated,health"],
            self.timeout,
        )?;
        Ok(parse_pool_listing(&out))
    }
}

/// Run a command to completion, killing it once `timeout` passes.
/// Returns trimmed stdout.
///
/// Both pipes are drained on their own threads while the child runs.
pub fn run_command(program: &str, args: &[&str], timeout: Duration) -> Result<String, FactError> {
    let cmd = format!("{} {}", program, args.join(" "));
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| FactError::Spawn {
            cmd: cmd.clone(),
            source,
        })?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(source) => return Err(FactError::Spawn { cmd, source }),
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            // Reader threads finish on their own once the pipes close.
            return Err(FactError::TimedOut { cmd, timeout });
        }
        thread::sleep(Duration::from_millis(50));
    };

    let stdout = collect(stdout);
    if !status.success() {
        return Err(FactError::Failed {
            cmd,
            status,
            stderr: String::from_utf8_lossy(&collect(stderr)).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&stdout).trim().to_string())
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn read_trimmed(path: &Path) -> Result<String, FactError> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| FactError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Classify a `/sys/class/net/<if>` directory.
pub fn link_kind(dir: &Path) -> LinkKind {
    if dir.join("bonding").is_dir() {
        return LinkKind::Bond;
    }
    if dir.join("bonding_slave").is_dir() {
        return LinkKind::BondSlave;
    }
    if dir.join("tun_flags").exists() {
        return LinkKind::Tunnel;
    }
    let arp_type = read_trimmed(&dir.join("type"))
        .ok()
        .and_then(|s| s.parse::<u32>().ok());
    if arp_type.is_some_and(|t| TUNNEL_ARP_TYPES.contains(&t)) {
        return LinkKind::Tunnel;
    }
    // Physical devices have a backing `device`; everything else is some other virtual kind.
    if dir.join("device").exists() {
        return LinkKind::Unset;
    }
    let devtype = read_trimmed(&dir.join("uevent"))
        .ok()
        .and_then(|uevent| {
            uevent
                .lines()
                .find_map(|l| l.strip_prefix("DEVTYPE=").map(str::to_string))
        });
    match devtype {
        Some(devtype) => LinkKind::Other(devtype),
        None if arp_type == Some(772) => LinkKind::Unset, // loopback
        None => LinkKind::Other("virtual".into()),
    }
}

/// `uname -snm` prints kernel name, node name, machine, in that order.
pub fn parse_uname(out: &str) -> Result<SystemInfo, FactError> {
    let fields: Vec<&str> = out.split_whitespace().collect();
    match fields.as_slice() {
        [os, host, machine] => Ok(SystemInfo {
            hostname: host.to_string(),
            os_name: os.to_string(),
            machine: machine.to_string(),
        }),
        _ => Err(FactError::Parse {
            what: "uname output",
            text: out.to_string(),
        }),
    }
}

pub fn parse_proc_uptime(text: &str) -> Result<u64, FactError> {
    text.split_whitespace()
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .map(|secs| secs as u64)
        .ok_or_else(|| FactError::Parse {
            what: "/proc/uptime",
            text: text.to_string(),
        })
}

pub fn parse_loadavg(text: &str) -> Result<[f64; 3], FactError> {
    let bad = || FactError::Parse {
        what: "/proc/loadavg",
        text: text.to_string(),
    };
    let mut load = [0.0; 3];
    let mut fields = text.split_whitespace();
    for slot in &mut load {
        *slot = fields
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(bad)?;
    }
    Ok(load)
}

/// Render elapsed seconds the way `uptime` does: "3 days, 4:05", "4:05", "12 min".
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let mins = (secs % 3_600) / 60;

    let clock = if hours > 0 {
        format!("{}:{:02}", hours, mins)
    } else {
        format!("{} min", mins)
    };
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

/// First IPv4 address per device from `ip -4 -o addr show`, in listing order.
pub fn parse_ipv4_addrs(out: &str) -> Vec<(String, String)> {
    let mut addrs: Vec<(String, String)> = Vec::new();
    for line in out.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [_, dev, "inet", cidr, ..] = fields[..] else {
            continue;
        };
        let dev = dev.split('@').next().unwrap_or(dev);
        let addr = cidr.split('/').next().unwrap_or(cidr);
        if !addrs.iter().any(|(d, _)| d == dev) {
            addrs.push((dev.to_string(), addr.to_string()));
        }
    }
    addrs
}

/// Records of `zpool list -H -o name,size,allocated,health`. Short lines are skipped.
pub fn parse_pool_listing(out: &str) -> Vec<PoolRecord> {
    out.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [name, size, allocated, health, ..] => Some(PoolRecord {
                    name: name.to_string(),
                    size: size.to_string(),
                    allocated: allocated.to_string(),
                    health: health.to_string(),
                }),
                _ => {
                    warn!("skipping pool record {:?}", line);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeFacts;

    #[test]
    fn uname_fields() {
        let info = parse_uname("Linux truenas x86_64\n").unwrap();
        assert_eq!(info.hostname, "truenas");
        assert_eq!(info.os_name, "Linux");
        assert_eq!(info.machine, "x86_64");
        assert!(parse_uname("Linux").is_err());
    }

    #[test]
    fn uptime_formats() {
        assert_eq!(format_uptime(12 * 60 + 30), "12 min");
        assert_eq!(format_uptime(4 * 3600 + 5 * 60), "4:05");
        assert_eq!(format_uptime(86_400 + 7 * 60), "1 day, 7 min");
        assert_eq!(format_uptime(3 * 86_400 + 4 * 3600 + 5 * 60), "3 days, 4:05");
    }

    #[test]
    fn proc_files() {
        assert_eq!(parse_proc_uptime("350735.47 234388.90").unwrap(), 350_735);
        assert_eq!(
            parse_loadavg("0.15 0.10 0.05 1/123 4567").unwrap(),
            [0.15, 0.10, 0.05]
        );
        assert!(parse_loadavg("0.15 0.10").is_err());
        assert!(parse_proc_uptime("").is_err());
    }

    #[test]
    fn ip_addr_listing() {
        let out = "\
1: lo    inet 127.0.0.1/8 scope host lo\\       valid_lft forever preferred_lft forever
2: eth0    inet 10.0.0.5/24 brd 10.0.0.255 scope global eth0\\       valid_lft forever
2: eth0    inet 10.0.0.9/24 scope global secondary eth0\\       valid_lft forever
5: vlan10@eth0    inet 192.168.10.2/24 scope global vlan10";
        assert_eq!(
            parse_ipv4_addrs(out),
            vec![
                ("lo".to_string(), "127.0.0.1".to_string()),
                ("eth0".to_string(), "10.0.0.5".to_string()),
                ("vlan10".to_string(), "192.168.10.2".to_string()),
            ]
        );
    }

    #[test]
    fn pool_listing() {
        let out = "tank\t10T\t2T\tONLINE\nboot-pool\t32G\t3.1G\tDEGRADED\nbroken\n";
        let pools = parse_pool_listing(out);
        assert_eq!(pools.len(), 2);
        assert_eq!(pools[0].name, "tank");
        assert_eq!(pools[0].size, "10T");
        assert_eq!(pools[0].allocated, "2T");
        assert_eq!(pools[0].health, "ONLINE");
        assert_eq!(pools[1].health, "DEGRADED");
    }

    #[test]
    fn link_kinds_from_sysfs() {
        let root = std::env::temp_dir().join(format!("lcd-menu-sysfs-{}", std::process::id()));
        let mk = |name: &str| {
            let dir = root.join(name);
            fs::create_dir_all(&dir).unwrap();
            dir
        };

        let eth0 = mk("eth0");
        fs::create_dir_all(eth0.join("device")).unwrap();
        let bond0 = mk("bond0");
        fs::create_dir_all(bond0.join("bonding")).unwrap();
        let eth1 = mk("eth1");
        fs::create_dir_all(eth1.join("bonding_slave")).unwrap();
        fs::create_dir_all(eth1.join("device")).unwrap();
        let tun0 = mk("tun0");
        fs::write(tun0.join("tun_flags"), "0x1001\n").unwrap();
        let gre1 = mk("gre1");
        fs::write(gre1.join("type"), "778\n").unwrap();
        let br0 = mk("br0");
        fs::write(br0.join("uevent"), "DEVTYPE=bridge\nINTERFACE=br0\n").unwrap();

        assert_eq!(link_kind(&eth0), LinkKind::Unset);
        assert_eq!(link_kind(&bond0), LinkKind::Bond);
        assert_eq!(link_kind(&eth1), LinkKind::BondSlave);
        assert_eq!(link_kind(&tun0), LinkKind::Tunnel);
        assert_eq!(link_kind(&gre1), LinkKind::Tunnel);
        assert_eq!(link_kind(&br0), LinkKind::Other("bridge".into()));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn command_failures_are_errors() {
        assert!(matches!(
            run_command("lcd-menu-no-such-binary", &[], COMMAND_TIMEOUT),
            Err(FactError::Spawn { .. })
        ));
    }

    #[test]
    fn large_output_is_not_cut_off_by_timeout() {
        let out = run_command(
            "sh",
            &["-c", "head -c 200000 /dev/zero | tr '\\0' 'x'"],
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(out.len(), 200_000);
        assert!(out.bytes().all(|b| b == b'x'));
    }

    #[test]
    fn nonzero_exit_carries_stderr() {
        match run_command("sh", &["-c", "echo boom >&2; exit 3"], COMMAND_TIMEOUT) {
            Err(FactError::Failed { stderr, status, .. }) => {
                assert_eq!(stderr, "boom");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn failed_gathering_falls_back() {
        let facts = FakeFacts {
            fail: true,
            ..FakeFacts::default()
        };
        let snap = Snapshot::gather(&facts);
        assert_eq!(snap.system, SystemInfo::fallback());
        assert_eq!(snap.version, "unknown");
        assert!(snap.interfaces.is_empty());
        assert!(snap.pools.is_empty());
    }
}
