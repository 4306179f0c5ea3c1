//! Kernel abstraction for managing the threading system.
//!
//! This module provides the main `Kernel` struct: the thread registry, the
//! scheduler, and the `current`/`next` thread slots shared with the
//! context-switch trampoline. Every access to that shared state goes
//! through [`Kernel::with_state`], which masks interrupts first.

use crate::arch::{critical_section, frame, Arch};
use crate::config::{IDLE_SLOT, MAX_THREADS};
use crate::errors::{KernelError, KernelResult, StartError};
use crate::sched::{priority, Scheduler};
use crate::thread::{ReadyMask, Registry, Tcb, ThreadEntry, ThreadId};
use crate::time::{timeout, Duration, Instant, TickCounter};
use core::marker::PhantomData;
use portable_atomic::{AtomicBool, Ordering};

/// Kernel entry points used by the context-switch trampoline.
pub trait ContextSwitch: Sync {
    /// Record `saved_sp` for the outgoing thread, make `next` current and
    /// return its saved stack pointer.
    ///
    /// # Safety
    ///
    /// Must only be called by the trampoline, with interrupts masked and
    /// the outgoing thread's software frame already pushed at `saved_sp`.
    unsafe fn switch_context(&self, saved_sp: usize) -> usize;
}

/// Kernel the trampoline switches for, registered by [`Kernel::run`].
static SWITCH_TARGET: spin::Once<&'static dyn ContextSwitch> = spin::Once::new();

/// Get the registered switch target (for the trampoline).
///
/// Returns `None` until a kernel has entered [`Kernel::run`].
pub fn switch_target() -> Option<&'static dyn ContextSwitch> {
    SWITCH_TARGET.get().copied()
}

/// Scheduler counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelStats {
    /// Registered threads, idle included
    pub threads: usize,
    /// Threads with their ready bit set
    pub ready: usize,
    /// Threads waiting on a timeout
    pub blocked: usize,
    /// Ticks since start
    pub ticks: u64,
    /// Completed context switches
    pub switches: u64,
}

/// State shared between thread code, the tick handler and the trampoline.
pub struct KernelState<S: Scheduler> {
    registry: Registry,
    scheduler: S,
    current: Option<usize>,
    next: Option<usize>,
    switches: u64,
}

impl<S: Scheduler> KernelState<S> {
    const fn new(scheduler: S) -> Self {
        Self {
            registry: Registry::new(),
            scheduler,
            current: None,
            next: None,
            switches: 0,
        }
    }

    /// Pick the next thread and arm a switch if it is not the current one.
    ///
    /// Returns `true` if a switch was armed.
    fn schedule<A: Arch>(&mut self) -> bool {
        if self.registry.is_empty() {
            return false;
        }

        let candidate = self.scheduler.pick_next(&self.registry);
        self.next = Some(candidate);
        if self.current != self.next {
            A::pend_context_switch();
            true
        } else {
            false
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn next(&self) -> Option<usize> {
        self.next
    }
}

/// Main kernel handle.
///
/// # Type Parameters
///
/// * `A` - Architecture implementation
/// * `S` - Scheduler implementation
pub struct Kernel<A: Arch, S: Scheduler> {
    state: spin::Mutex<KernelState<S>>,
    ticks: TickCounter,
    /// Whether the idle thread has been installed
    initialized: AtomicBool,
    /// Whether the first scheduling decision has been made
    running: AtomicBool,
    _arch: PhantomData<fn() -> A>,
}

impl<A: Arch, S: Scheduler> Kernel<A, S> {
    /// Create a new kernel instance.
    ///
    /// `const` so the kernel can live in a `static` that thread bodies and
    /// interrupt handlers name directly.
    pub const fn new(scheduler: S) -> Self {
        Self {
            state: spin::Mutex::new(KernelState::new(scheduler)),
            ticks: TickCounter::new(),
            initialized: AtomicBool::new(false),
            running: AtomicBool::new(false),
            _arch: PhantomData,
        }
    }

    /// Run `f` on the shared state inside a critical section.
    ///
    /// The mutex can never be contended on a single core: every holder has
    /// interrupts masked.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut KernelState<S>) -> R) -> R {
        critical_section::<A, _>(|| f(&mut self.state.lock()))
    }

    /// Initialize the kernel with the default idle thread.
    ///
    /// Configures exception priorities (tick highest, switch lowest) and
    /// installs the idle thread in slot 0 on `idle_stack`.
    pub fn init(&self, idle_stack: &'static mut [u32]) -> KernelResult<()> {
        self.init_with_idle(idle_stack, idle_main::<A>)
    }

    /// Initialize the kernel with a custom idle thread.
    ///
    /// `idle` must never block.
    pub fn init_with_idle(&self, idle_stack: &'static mut [u32], idle: ThreadEntry) -> KernelResult<()> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(KernelError::AlreadyInitialized);
        }

        A::configure_exception_priorities();

        if let Err(e) = self.register(idle, idle_stack, priority::IDLE) {
            self.initialized.store(false, Ordering::Release);
            return Err(e.into());
        }

        crate::ktrace!("[init] idle thread installed in slot {}", IDLE_SLOT);
        Ok(())
    }

    /// Check if the kernel has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Check if the first scheduling decision has been made.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Register a thread.
    ///
    /// Builds the thread's initial context at the top of `stack` and marks
    /// it ready. Fails without touching the registry if the kernel is not
    /// initialized, the registry is full, or `stack` cannot hold the
    /// initial frame.
    ///
    /// # Arguments
    ///
    /// * `entry` - Thread body; never returns
    /// * `stack` - Stack memory, owned by the thread from now on
    /// * `priority` - Static priority (only the priority scheduler uses it)
    pub fn start_thread(
        &self,
        entry: ThreadEntry,
        stack: &'static mut [u32],
        priority: u8,
    ) -> KernelResult<ThreadId> {
        if !self.is_initialized() {
            return Err(StartError::NotInitialized.into());
        }

        match self.register(entry, stack, priority) {
            Ok(id) => {
                crate::ktrace!("[start] thread {} registered (priority {})", id, priority);
                Ok(id)
            }
            Err(e) => {
                crate::ktrace!("[start] rejected: {}", e);
                Err(e.into())
            }
        }
    }

    fn register(
        &self,
        entry: ThreadEntry,
        stack: &'static mut [u32],
        priority: u8,
    ) -> Result<ThreadId, StartError> {
        self.with_state(|state| {
            if state.registry.is_full() {
                return Err(StartError::RegistryFull {
                    capacity: MAX_THREADS,
                });
            }
            let sp = frame::build_initial_frame(stack, entry)?;
            let slot = state.registry.register(Tcb::new(sp, priority, stack))?;
            Ok(ThreadId::from_slot(slot))
        })
    }

    /// Make the first scheduling decision.
    ///
    /// Arms the switch into the first selected thread; on hardware it is
    /// taken as soon as interrupts are unmasked. Calls after the first are
    /// no-ops.
    pub fn start_scheduling(&self) -> KernelResult<()> {
        if !self.is_initialized() {
            return Err(KernelError::NotInitialized);
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        self.with_state(|state| {
            state.schedule::<A>();
        });
        Ok(())
    }

    /// Start multitasking. Never returns.
    ///
    /// Registers this kernel with the trampoline, makes the first
    /// scheduling decision with interrupts masked, then unmasks them; the
    /// pending switch abandons the caller's stack.
    ///
    /// # Panics
    ///
    /// Panics if called before `init`.
    pub fn run(&'static self) -> !
    where
        Self: 'static,
    {
        A::disable_interrupts();
        SWITCH_TARGET.call_once(|| self as &'static dyn ContextSwitch);

        if let Err(e) = self.start_scheduling() {
            panic!("Kernel::run: {}", e);
        }
        crate::ktrace!("[run] {} threads, {} scheduling", self.thread_count(), self.scheduler_name());

        A::enable_interrupts();

        loop {
            A::wait_for_interrupt();
        }
    }

    /// Run the scheduler and arm a switch if its choice changed.
    pub fn schedule(&self) {
        self.with_state(|state| {
            state.schedule::<A>();
        });
    }

    /// Suspend the calling thread for `ticks` ticks.
    ///
    /// The thread leaves the ready set and the scheduler runs immediately,
    /// so another thread (or idle) gets the CPU without waiting for the
    /// next tick. Returns once the thread has been switched back in.
    /// `block(0)` only yields.
    ///
    /// # Panics
    ///
    /// Panics if called from the idle thread or before the first switch:
    /// idle is the fallback when nothing else is ready and must never wait.
    pub fn block(&self, ticks: u32) {
        self.with_state(|state| {
            let current = match state.current {
                Some(slot) => slot,
                None => panic!("Kernel::block called before the first context switch"),
            };
            assert!(current != IDLE_SLOT, "the idle thread must never block");

            timeout::arm(&mut state.registry, current, ticks);
            state.schedule::<A>();
        });
    }

    /// Suspend the calling thread for at least `duration`.
    pub fn sleep(&self, duration: Duration) {
        self.block(duration.as_ticks());
    }

    /// Count every waiting timeout down by one tick.
    ///
    /// Threads whose timeout reaches zero become ready. Does not schedule.
    pub fn permit_tick(&self) {
        self.with_state(|state| {
            timeout::permit_tick(&mut state.registry);
        });
    }

    /// Tick handler body: advance time, wake expired threads, reschedule.
    ///
    /// Call exactly once per timer period from the tick interrupt.
    pub fn tick(&self) {
        self.ticks.increment();
        self.with_state(|state| {
            timeout::permit_tick(&mut state.registry);
            if self.running.load(Ordering::Acquire) {
                state.schedule::<A>();
            }
        });
    }

    /// Thread executing now (as far as the last completed switch knows).
    pub fn current_thread(&self) -> Option<ThreadId> {
        self.with_state(|state| state.current.map(ThreadId::from_slot))
    }

    /// Thread chosen by the last scheduling decision.
    pub fn next_thread(&self) -> Option<ThreadId> {
        self.with_state(|state| state.next.map(ThreadId::from_slot))
    }

    /// Registered threads, idle included.
    pub fn thread_count(&self) -> usize {
        self.with_state(|state| state.registry.len())
    }

    /// Snapshot of the ready mask.
    pub fn ready_mask(&self) -> ReadyMask {
        self.with_state(|state| state.registry.ready_mask())
    }

    /// Remaining timeout of `id`, `None` if not registered.
    pub fn timeout_of(&self, id: ThreadId) -> Option<u32> {
        self.with_state(|state| state.registry.get(id.slot()).map(Tcb::timeout))
    }

    /// Static priority of `id`, `None` if not registered.
    pub fn priority_of(&self, id: ThreadId) -> Option<u8> {
        self.with_state(|state| state.registry.get(id.slot()).map(Tcb::priority))
    }

    /// Words at the bottom of `id`'s stack that still hold the fill pattern.
    ///
    /// An inspection aid: a value near zero means the thread came close
    /// to (or past) the end of its stack.
    pub fn stack_headroom(&self, id: ThreadId) -> Option<usize> {
        let (base, words) = self.with_state(|state| {
            state
                .registry
                .get(id.slot())
                .map(|tcb| (tcb.stack_base, tcb.stack_words))
        })?;

        // Registered stacks are `'static` and never released.
        let stack = unsafe { core::slice::from_raw_parts(base as *const u32, words) };
        Some(frame::unused_stack_words(stack))
    }

    /// Time since the first tick.
    pub fn uptime(&self) -> Instant {
        self.ticks.now()
    }

    /// Name of the scheduling policy.
    pub fn scheduler_name(&self) -> &'static str {
        self.with_state(|state| state.scheduler.name())
    }

    /// Current scheduler counters.
    pub fn stats(&self) -> KernelStats {
        self.with_state(|state| {
            let registry = &state.registry;
            let blocked = registry
                .user_slots()
                .filter(|&slot| registry.get(slot).is_some_and(Tcb::is_waiting))
                .count();
            KernelStats {
                threads: registry.len(),
                ready: registry.ready_mask().count(),
                blocked,
                ticks: self.ticks.ticks(),
                switches: state.switches,
            }
        })
    }
}

impl<A: Arch, S: Scheduler> ContextSwitch for Kernel<A, S> {
    unsafe fn switch_context(&self, saved_sp: usize) -> usize {
        self.with_state(|state| {
            let Some(next) = state.next else {
                // Nothing selected yet: resume whatever was interrupted
                return saved_sp;
            };

            // The very first switch comes from the boot stack, which is
            // abandoned rather than saved.
            if let Some(tcb) = state.current.and_then(|slot| state.registry.get_mut(slot)) {
                tcb.sp = saved_sp;
            }

            state.current = Some(next);
            state.switches += 1;
            state.registry.get(next).map_or(saved_sp, |tcb| tcb.sp)
        })
    }
}

/// Default idle thread: sleep until the next interrupt, forever.
fn idle_main<A: Arch>() -> ! {
    loop {
        A::wait_for_interrupt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::host::HostArch;
    use crate::config::IDLE_STACK_WORDS;
    use crate::sched::RoundRobinScheduler;
    use crate::tests::helpers::{leak_stack, park, service_switches};

    type TestKernel = Kernel<HostArch, RoundRobinScheduler>;

    fn kernel_with_threads(users: usize) -> TestKernel {
        let kernel = TestKernel::new(RoundRobinScheduler::new());
        kernel.init(leak_stack(64)).unwrap();
        for _ in 0..users {
            kernel.start_thread(park, leak_stack(64), priority::NORMAL).unwrap();
        }
        kernel
    }

    #[test]
    fn test_init_installs_idle() {
        let kernel = TestKernel::new(RoundRobinScheduler::new());
        assert!(!kernel.is_initialized());
        kernel.init(leak_stack(64)).unwrap();

        assert!(kernel.is_initialized());
        assert_eq!(kernel.thread_count(), 1);
        assert!(kernel.ready_mask().is_empty());
        assert_eq!(kernel.init(leak_stack(64)), Err(KernelError::AlreadyInitialized));
    }

    #[test]
    fn test_init_with_tiny_idle_stack_fails() {
        let kernel = TestKernel::new(RoundRobinScheduler::new());
        let err = kernel.init(leak_stack(4)).unwrap_err();
        assert!(matches!(err, KernelError::Start(StartError::StackTooSmall { .. })));
        assert!(!kernel.is_initialized());
    }

    #[test]
    fn test_start_before_init_rejected() {
        let kernel = TestKernel::new(RoundRobinScheduler::new());
        let err = kernel.start_thread(park, leak_stack(64), 1).unwrap_err();
        assert_eq!(err, KernelError::Start(StartError::NotInitialized));
    }

    #[test]
    fn test_capacity_boundary() {
        let kernel = kernel_with_threads(MAX_THREADS - 1);
        assert_eq!(kernel.thread_count(), MAX_THREADS);

        let extra = leak_stack(64);
        let extra_base = extra.as_ptr();
        let err = kernel.start_thread(park, extra, 1).unwrap_err();
        assert_eq!(err, KernelError::Start(StartError::RegistryFull { capacity: MAX_THREADS }));
        assert_eq!(kernel.thread_count(), MAX_THREADS);
        // The rejected stack was never written
        assert_eq!(unsafe { *extra_base }, 0);
    }

    #[test]
    fn test_first_switch_selects_first_user_thread() {
        let kernel = kernel_with_threads(2);
        assert_eq!(kernel.current_thread(), None);

        kernel.start_scheduling().unwrap();
        assert_eq!(kernel.next_thread(), Some(ThreadId::from_slot(1)));
        assert!(HostArch::take_pending_switch());

        unsafe { kernel.switch_context(0xdead_0000) };
        assert_eq!(kernel.current_thread(), Some(ThreadId::from_slot(1)));
    }

    #[test]
    fn test_first_switch_without_user_threads_runs_idle() {
        let kernel = kernel_with_threads(0);
        kernel.start_scheduling().unwrap();
        service_switches(&kernel);
        assert_eq!(kernel.current_thread(), Some(ThreadId::IDLE));
    }

    #[test]
    fn test_no_redundant_switch_armed() {
        let kernel = kernel_with_threads(1);
        kernel.start_scheduling().unwrap();
        service_switches(&kernel);
        assert_eq!(kernel.current_thread(), Some(ThreadId::from_slot(1)));

        // Only one ready thread: the scheduler keeps picking the current one
        let before = HostArch::pend_requests();
        kernel.schedule();
        kernel.tick();
        assert_eq!(HostArch::pend_requests(), before);
    }

    #[test]
    fn test_block_switches_away_and_tick_wakes() {
        let kernel = kernel_with_threads(2);
        kernel.start_scheduling().unwrap();
        service_switches(&kernel);
        let first = ThreadId::from_slot(1);

        kernel.block(2);
        assert_eq!(kernel.timeout_of(first), Some(2));
        assert!(!kernel.ready_mask().contains(1));
        service_switches(&kernel);
        assert_eq!(kernel.current_thread(), Some(ThreadId::from_slot(2)));

        kernel.tick();
        kernel.tick();
        assert_eq!(kernel.timeout_of(first), Some(0));
        assert!(kernel.ready_mask().contains(1));
        service_switches(&kernel);
        assert_eq!(kernel.current_thread(), Some(first));
    }

    #[test]
    fn test_sleep_rounds_up_to_whole_ticks() {
        let kernel = kernel_with_threads(1);
        assert!(!kernel.is_running());
        kernel.start_scheduling().unwrap();
        assert!(kernel.is_running());
        service_switches(&kernel);
        let sleeper = ThreadId::from_slot(1);

        kernel.sleep(Duration::from_micros(1_500));
        assert_eq!(kernel.timeout_of(sleeper), Some(2));
        service_switches(&kernel);
        assert_eq!(kernel.current_thread(), Some(ThreadId::IDLE));

        kernel.tick();
        service_switches(&kernel);
        assert_eq!(kernel.current_thread(), Some(ThreadId::IDLE));

        kernel.tick();
        service_switches(&kernel);
        assert_eq!(kernel.current_thread(), Some(sleeper));
        assert_eq!(kernel.timeout_of(sleeper), Some(0));
    }

    #[test]
    fn test_start_scheduling_requires_init() {
        let kernel = TestKernel::new(RoundRobinScheduler::new());
        assert_eq!(kernel.start_scheduling(), Err(KernelError::NotInitialized));
        assert!(!kernel.is_running());
        assert!(!HostArch::take_pending_switch());
    }

    #[test]
    fn test_block_zero_yields() {
        let kernel = kernel_with_threads(2);
        kernel.start_scheduling().unwrap();
        service_switches(&kernel);

        kernel.block(0);
        assert!(kernel.ready_mask().contains(1));
        service_switches(&kernel);
        assert_eq!(kernel.current_thread(), Some(ThreadId::from_slot(2)));
    }

    #[test]
    #[should_panic(expected = "the idle thread must never block")]
    fn test_idle_block_is_fatal() {
        let kernel = kernel_with_threads(0);
        kernel.start_scheduling().unwrap();
        service_switches(&kernel);
        kernel.block(10);
    }

    #[test]
    #[should_panic(expected = "before the first context switch")]
    fn test_block_before_run_is_fatal() {
        let kernel = kernel_with_threads(1);
        kernel.block(10);
    }

    #[test]
    fn test_permit_tick_does_not_schedule() {
        let kernel = kernel_with_threads(1);
        kernel.start_scheduling().unwrap();
        service_switches(&kernel);
        kernel.block(1);
        service_switches(&kernel);
        assert_eq!(kernel.current_thread(), Some(ThreadId::IDLE));

        kernel.permit_tick();
        assert!(kernel.ready_mask().contains(1));
        assert!(!HostArch::take_pending_switch());
        assert_eq!(kernel.current_thread(), Some(ThreadId::IDLE));
    }

    #[test]
    fn test_switch_saves_outgoing_stack_pointer() {
        let kernel = kernel_with_threads(2);
        kernel.start_scheduling().unwrap();
        service_switches(&kernel);

        kernel.block(5);
        assert!(HostArch::take_pending_switch());
        let incoming_sp = unsafe { kernel.switch_context(0x2000_1000) };

        let saved = kernel.with_state(|state| state.registry().get(1).map(Tcb::saved_sp));
        assert_eq!(saved, Some(0x2000_1000));
        let expected = kernel.with_state(|state| state.registry().get(2).map(Tcb::saved_sp));
        assert_eq!(Some(incoming_sp), expected);
    }

    #[test]
    fn test_stack_headroom_after_start() {
        let kernel = kernel_with_threads(1);
        let headroom = kernel.stack_headroom(ThreadId::from_slot(1)).unwrap();
        // 64 words minus the initial frame, minus at most one alignment word
        assert!(headroom >= 64 - frame::INITIAL_FRAME_WORDS - 1);
        assert!(headroom <= 64 - frame::INITIAL_FRAME_WORDS);
        assert_eq!(kernel.stack_headroom(ThreadId::from_slot(9)), None);
    }

    #[test]
    fn test_default_idle_stack_leaves_room_for_handlers() {
        let kernel = TestKernel::new(RoundRobinScheduler::new());
        kernel.init(leak_stack(IDLE_STACK_WORDS)).unwrap();
        let headroom = kernel.stack_headroom(ThreadId::IDLE).unwrap();
        // Two exception frames plus the tick and switch call chains
        assert!(headroom >= 2 * frame::HW_FRAME_WORDS + 200);
    }

    #[test]
    fn test_stats() {
        let kernel = kernel_with_threads(3);
        kernel.start_scheduling().unwrap();
        service_switches(&kernel);
        kernel.block(4);
        service_switches(&kernel);
        kernel.tick();

        let stats = kernel.stats();
        assert_eq!(stats.threads, 4);
        assert_eq!(stats.ready, 2);
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.switches, 2);
        assert_eq!(kernel.uptime(), Instant::from_ticks(1));
    }
}
