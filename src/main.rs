//! # StratOS Demo Firmware
//!
//! Boots the kernel with two autostart programs and lets a supervisor
//! program exercise the scheduling API:
//!
//! | Program | Created by | Behavior |
//! |---------|-----------|----------|
//! | `crunch` | autostart | busy arithmetic, never blocks |
//! | `supervisor` | autostart | spawns `sensor_poll`, then cycles strategies |
//! | `sensor_poll` | `supervisor` via `exec` | polling loop at priority 4 |
//!
//! The firmware builds only for the target; host builds (unit tests) get
//! a stub entry point.

#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_std)]
#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_main)]

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod firmware {
    use cortex_m_rt::entry;
    use panic_halt as _;

    use stratos::board::BoardHooks;
    use stratos::kernel;
    use stratos::scheduler::AutostartEntry;
    use stratos::strategy::StrategyKind;

    // -----------------------------------------------------------------------
    // Programs
    // -----------------------------------------------------------------------

    /// CPU-bound worker. Never yields — the only way it gives up the CPU
    /// is preemption at the timer tick.
    extern "C" fn crunch() -> ! {
        let mut acc: u32 = 0;
        loop {
            acc = acc.wrapping_mul(31).wrapping_add(7);
        }
    }

    /// Polling worker created at runtime by the supervisor.
    extern "C" fn sensor_poll() -> ! {
        let mut _reading: u32 = 0;
        loop {
            for _ in 0..500 {
                _reading = _reading.wrapping_add(1);
            }
        }
    }

    /// Spawns `sensor_poll` once, then rotates through the scheduling
    /// strategies to exercise the dispatch and reset paths.
    extern "C" fn supervisor() -> ! {
        // Table mutations from process context go through the kernel API,
        // which brackets them in a critical section.
        let _pid = kernel::exec(sensor_poll, 4);

        let mut spins: u32 = 0;
        loop {
            spins = spins.wrapping_add(1);
            if spins % 5_000_000 == 0 {
                let next = match kernel::get_strategy() {
                    StrategyKind::Even => StrategyKind::RoundRobin,
                    StrategyKind::RoundRobin => StrategyKind::InactiveAging,
                    _ => StrategyKind::Even,
                };
                kernel::set_strategy(next);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Autostart list (link-time, declaration order)
    // -----------------------------------------------------------------------

    static SUPERVISOR: AutostartEntry = AutostartEntry {
        program: supervisor,
        next: None,
    };
    static AUTOSTART: AutostartEntry = AutostartEntry {
        program: crunch,
        next: Some(&SUPERVISOR),
    };

    // -----------------------------------------------------------------------
    // Entry point
    // -----------------------------------------------------------------------

    /// Firmware entry. Initializes the kernel, then hands control to the
    /// scheduler. Does not return.
    #[entry]
    fn main() -> ! {
        let cp = cortex_m::Peripherals::take().unwrap();

        kernel::init(Some(&AUTOSTART), BoardHooks::SILENT);

        kernel::start(cp)
    }
}

/// Host builds only run the library's unit tests; there is no firmware
/// to start.
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn main() {}
