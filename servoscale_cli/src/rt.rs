//! Real-time setup for the busy-wait loop (Linux SCHED_FIFO / affinity / mlockall; macOS mlockall).

use std::sync::OnceLock;

use crate::cli::{RtArgs, RtLock};

static RT_ONCE: OnceLock<()> = OnceLock::new();

/// Apply the requested real-time settings once per process. Failures are logged, never fatal.
pub fn setup_rt_once(args: &RtArgs) {
    if !args.rt {
        return;
    }
    let lock = args.rt_lock.unwrap_or_else(RtLock::os_default);
    RT_ONCE.get_or_init(|| {
        match lock_memory(lock) {
            Ok(()) => tracing::info!(?lock, "rt: memory lock applied"),
            Err(e) => tracing::warn!(?lock, error = %e, "rt: mlockall failed"),
        }
        apply_scheduling(args.rt_prio, args.rt_cpu);
    });
}

#[cfg(unix)]
fn lock_memory(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => MCL_CURRENT,
        RtLock::All => MCL_CURRENT | MCL_FUTURE,
    };
    // SAFETY: mlockall only takes flags and has no memory-safety preconditions.
    if unsafe { mlockall(flags) } == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    let retryable = matches!(err.raw_os_error(), Some(c) if c == libc::EPERM || c == libc::ENOMEM);
    if lock == RtLock::All && retryable {
        // SAFETY: as above.
        if unsafe { mlockall(MCL_CURRENT) } == 0 {
            tracing::warn!(error = %err, "rt: mlockall(current|future) failed, locked current pages only");
            return Ok(());
        }
    }
    if retryable {
        eyre::bail!("{err}; {}; needs CAP_IPC_LOCK (or root) and a sufficient 'ulimit -l'", memlock_limit());
    }
    Err(err.into())
}

#[cfg(not(unix))]
fn lock_memory(_lock: RtLock) -> eyre::Result<()> {
    eyre::bail!("memory locking is not supported on this platform")
}

#[cfg(unix)]
fn memlock_limit() -> String {
    let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
    // SAFETY: getrlimit writes a full rlimit on success; it is only read when rc == 0.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) };
    if rc != 0 {
        return "memlock limit unknown".to_string();
    }
    // SAFETY: initialized by the successful call above.
    let cur = unsafe { rlim.assume_init() }.rlim_cur;
    if cur == libc::RLIM_INFINITY {
        "memlock limit: unlimited".to_string()
    } else {
        format!("memlock limit: {} KiB", cur / 1024)
    }
}

#[cfg(target_os = "linux")]
fn apply_scheduling(prio: Option<i32>, cpu: Option<usize>) {
    match fifo_priority(prio) {
        Ok(p) => tracing::info!(priority = p, "rt: SCHED_FIFO applied"),
        Err(e) => tracing::warn!(?prio, error = %e, "rt: SCHED_FIFO not applied"),
    }
    let cpu = cpu.unwrap_or(0);
    match pin_to_cpu(cpu) {
        Ok(()) => tracing::info!(cpu, "rt: affinity applied"),
        Err(e) => tracing::warn!(cpu, error = %e, "rt: affinity not applied"),
    }
}

#[cfg(not(target_os = "linux"))]
fn apply_scheduling(prio: Option<i32>, cpu: Option<usize>) {
    if prio.is_some() || cpu.is_some() {
        tracing::warn!("rt: SCHED_FIFO and affinity are Linux only; ignoring --rt-prio/--rt-cpu");
    }
}

/// Set SCHED_FIFO with `wanted` (default: maximum) clamped to the system range.
#[cfg(target_os = "linux")]
fn fifo_priority(wanted: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param, sched_setscheduler};

    // SAFETY: plain queries with no pointer arguments.
    let (min, max) = unsafe { (sched_get_priority_min(SCHED_FIFO), sched_get_priority_max(SCHED_FIFO)) };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    let prio = wanted.unwrap_or(max).clamp(min, max);
    let param = sched_param { sched_priority: prio };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    if unsafe { sched_setscheduler(0, SCHED_FIFO, &param) } != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EPERM) {
            eyre::bail!(
                "{err}; needs CAP_SYS_NICE or root (try 'sudo setcap cap_sys_nice=ep $(which servoscale)')"
            );
        }
        return Err(err.into());
    }
    Ok(prio)
}

/// Pin the process to `cpu` if the current affinity mask allows it.
#[cfg(target_os = "linux")]
fn pin_to_cpu(cpu: usize) -> eyre::Result<()> {
    use libc::{CPU_ISSET, CPU_SET, CPU_ZERO, cpu_set_t, sched_getaffinity, sched_setaffinity};

    let capacity = std::mem::size_of::<cpu_set_t>() * 8;
    if cpu >= capacity {
        eyre::bail!("CPU {cpu} exceeds cpu_set_t capacity {capacity}");
    }
    // SAFETY: cpu_set_t is plain data; all-zero is a valid empty set.
    let mut allowed: cpu_set_t = unsafe { std::mem::zeroed() };
    // SAFETY: `allowed` is a valid, correctly sized cpu_set_t.
    if unsafe { sched_getaffinity(0, std::mem::size_of::<cpu_set_t>(), &mut allowed) } != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    // SAFETY: `cpu` is below the set capacity.
    let permitted = unsafe { CPU_ISSET(cpu, &allowed) };
    if !permitted {
        eyre::bail!("CPU {cpu} not permitted by current affinity mask");
    }
    // SAFETY: as above.
    let mut desired: cpu_set_t = unsafe { std::mem::zeroed() };
    // SAFETY: `desired` is valid and `cpu` is in range.
    unsafe {
        CPU_ZERO(&mut desired);
        CPU_SET(cpu, &mut desired);
    }
    // SAFETY: `desired` outlives the call.
    if unsafe { sched_setaffinity(0, std::mem::size_of::<cpu_set_t>(), &desired) } != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_rt_is_a_no_op() {
        let args = RtArgs {
            rt: false,
            rt_prio: Some(99),
            rt_lock: Some(RtLock::All),
            rt_cpu: Some(0),
        };
        setup_rt_once(&args);
        assert!(RT_ONCE.get().is_none());
    }

    #[test]
    fn no_lock_always_succeeds() {
        assert!(lock_memory(RtLock::None).is_ok());
    }
}
