// src/navigation/engine.rs
//! Route following engine and its three polling monitors

use super::metrics::{
    Crosstrack, DerivedMetrics, EtaMetrics, LiveStatus, NavigationSnapshot, WaypointFix,
};
use crate::{
    error::{NavError, Result},
    geo::{cross_track, great_circle},
    route::{Route, RouteCursor, Waypoint},
};
use chrono::Local;
use log::{debug, error, info, warn};
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
    time::Duration,
};
use tokio::task::JoinHandle;

/// Tunables for the monitors
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// A waypoint closer than this counts as reached
    pub arrival_threshold_nm: f64,
    pub distance_interval: Duration,
    pub arrival_interval: Duration,
    pub crosstrack_interval: Duration,
    pub waypoint_alarm_nm: f64,
    pub crosstrack_alarm_nm: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            arrival_threshold_nm: 0.02,
            distance_interval: Duration::from_secs(1),
            arrival_interval: Duration::from_secs(1),
            crosstrack_interval: Duration::from_secs(1),
            waypoint_alarm_nm: 0.2,
            crosstrack_alarm_nm: 1.0,
        }
    }
}

/// The independent polling loops run while route mode is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Monitor {
    Distance,
    Arrival,
    Crosstrack,
}

impl Monitor {
    pub const ALL: [Monitor; 3] = [Monitor::Distance, Monitor::Arrival, Monitor::Crosstrack];

    fn interval(&self, settings: &EngineSettings) -> Duration {
        match self {
            Monitor::Distance => settings.distance_interval,
            Monitor::Arrival => settings.arrival_interval,
            Monitor::Crosstrack => settings.crosstrack_interval,
        }
    }
}

impl fmt::Display for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Monitor::Distance => write!(f, "distance"),
            Monitor::Arrival => write!(f, "arrival"),
            Monitor::Crosstrack => write!(f, "crosstrack"),
        }
    }
}

// Each field group has its own lock. Lock order is cursor before any
// metric group; live status is copied out and released first.
struct Shared {
    route: Arc<Route>,
    settings: EngineSettings,
    enabled: AtomicBool,
    session: AtomicU64,
    live: RwLock<LiveStatus>,
    cursor: RwLock<RouteCursor>,
    fix: RwLock<WaypointFix>,
    eta: RwLock<EtaMetrics>,
    crosstrack: RwLock<Crosstrack>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    fn is_active(&self, session: u64) -> bool {
        self.enabled.load(Ordering::SeqCst) && self.session.load(Ordering::SeqCst) == session
    }

    fn tick(&self, monitor: Monitor) -> Result<()> {
        match monitor {
            Monitor::Distance => self.distance_tick(),
            Monitor::Arrival => self.arrival_tick(),
            Monitor::Crosstrack => self.crosstrack_tick(),
        }
    }

    fn distance_tick(&self) -> Result<()> {
        let live = *read(&self.live);
        let mut cursor = write(&self.cursor);

        let (fix, arrived) = {
            let waypoint = match cursor.current() {
                Some(waypoint) => waypoint,
                None => {
                    debug!("No active waypoint yet");
                    return Ok(());
                }
            };
            let leg = great_circle(
                live.latitude,
                live.longitude,
                waypoint.latitude,
                waypoint.longitude,
            )?;
            let fix = WaypointFix {
                distance: leg.distance,
                bearing: leg.bearing,
                total_distance: leg.distance + cursor.remaining_distance(),
                alarm: leg.distance < self.settings.waypoint_alarm_nm,
            };
            (fix, leg.distance < self.settings.arrival_threshold_nm)
        };

        *write(&self.fix) = fix;

        if arrived && !cursor.is_at_destination() {
            let reached = cursor.current().map(|w| w.name.clone()).unwrap_or_default();
            let next = cursor.advance();
            info!("Reached {}, next waypoint {}", reached, next.name);
        }
        Ok(())
    }

    fn arrival_tick(&self) -> Result<()> {
        let speed = read(&self.live).speed;
        let fix = *read(&self.fix);

        let eta = EtaMetrics::project(fix.distance, fix.total_distance, speed, Local::now());
        *write(&self.eta) = eta;
        Ok(())
    }

    fn crosstrack_tick(&self) -> Result<()> {
        let live = *read(&self.live);
        let xte = {
            let cursor = read(&self.cursor);
            match cursor.previous() {
                Some(origin) => {
                    let from_origin = great_circle(
                        origin.latitude,
                        origin.longitude,
                        live.latitude,
                        live.longitude,
                    )?;
                    Crosstrack::from_signed(
                        cross_track(from_origin, origin.bearing_to_next),
                        self.settings.crosstrack_alarm_nm,
                    )
                }
                None => Crosstrack::NONE,
            }
        };
        *write(&self.crosstrack) = xte;
        Ok(())
    }
}

/// Follows a loaded route against a live position feed.
///
/// Cloning shares the same state, so one clone can feed positions while
/// another reads metrics.
#[derive(Clone)]
pub struct NavigationEngine {
    shared: Arc<Shared>,
}

impl NavigationEngine {
    pub fn new(route: Route, settings: EngineSettings) -> Self {
        let route = Arc::new(route);
        Self {
            shared: Arc::new(Shared {
                cursor: RwLock::new(RouteCursor::new(Arc::clone(&route))),
                route,
                settings,
                enabled: AtomicBool::new(false),
                session: AtomicU64::new(0),
                live: RwLock::new(LiveStatus::default()),
                fix: RwLock::new(WaypointFix::default()),
                eta: RwLock::new(EtaMetrics::UNKNOWN),
                crosstrack: RwLock::new(Crosstrack::NONE),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Start route mode and spawn the monitors on the current tokio runtime.
    ///
    /// Returns `Ok(false)` if route mode was already enabled. A cursor that
    /// has not entered the route yet is moved to the first waypoint; an
    /// existing cursor position is kept, so re-enabling resumes.
    pub fn enable(&self) -> Result<bool> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| NavError::Other(format!("Route mode needs a tokio runtime: {}", e)))?;

        if self.shared.enabled.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        let session = self.shared.session.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut cursor = write(&self.shared.cursor);
            if cursor.position().is_none() {
                cursor.advance();
            }
            if let Some(waypoint) = cursor.current() {
                info!("Route mode enabled, heading for {}", waypoint.name);
            }
        }

        let handles: Vec<JoinHandle<()>> = Monitor::ALL
            .iter()
            .map(|&monitor| runtime.spawn(run_monitor(Arc::clone(&self.shared), monitor, session)))
            .collect();
        // Loops of a session disabled without shutdown are kept until they exit
        let mut tasks = lock(&self.shared.tasks);
        tasks.retain(|handle| !handle.is_finished());
        tasks.extend(handles);

        Ok(true)
    }

    /// Stop route mode. Monitors finish their current tick and exit.
    pub fn disable(&self) -> bool {
        let was_enabled = self.shared.enabled.swap(false, Ordering::SeqCst);
        if was_enabled {
            info!("Route mode disabled");
        }
        was_enabled
    }

    /// Flip route mode, returning the new state
    pub fn toggle(&self) -> Result<bool> {
        if self.is_enabled() {
            self.disable();
            Ok(false)
        } else {
            self.enable()?;
            Ok(true)
        }
    }

    /// Disable route mode and wait for every monitor task to exit
    pub async fn shutdown(&self) {
        self.disable();
        let handles: Vec<JoinHandle<()>> = lock(&self.shared.tasks).drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Monitor task ended abnormally: {}", e);
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    /// Record the latest position and speed (knots). Last write wins.
    pub fn set_live_status(&self, latitude: f64, longitude: f64, speed: f64) {
        self.update_live_status(LiveStatus::new(latitude, longitude, speed));
    }

    pub fn update_live_status(&self, status: LiveStatus) {
        *write(&self.shared.live) = status;
    }

    pub fn live_status(&self) -> LiveStatus {
        *read(&self.shared.live)
    }

    /// Manually move to the next waypoint
    pub fn advance(&self) -> Waypoint {
        write(&self.shared.cursor).advance().clone()
    }

    /// Manually move back to the previous waypoint
    pub fn retreat(&self) -> Waypoint {
        write(&self.shared.cursor).retreat().clone()
    }

    pub fn current_waypoint(&self) -> Option<Waypoint> {
        read(&self.shared.cursor).current().cloned()
    }

    pub fn cursor_position(&self) -> Option<usize> {
        read(&self.shared.cursor).position()
    }

    pub fn remaining_distance(&self) -> f64 {
        read(&self.shared.cursor).remaining_distance()
    }

    pub fn route(&self) -> &Route {
        &self.shared.route
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.shared.settings
    }

    pub fn waypoint_fix(&self) -> WaypointFix {
        *read(&self.shared.fix)
    }

    pub fn eta(&self) -> EtaMetrics {
        *read(&self.shared.eta)
    }

    pub fn crosstrack(&self) -> Crosstrack {
        *read(&self.shared.crosstrack)
    }

    pub fn metrics(&self) -> DerivedMetrics {
        DerivedMetrics {
            waypoint: self.waypoint_fix(),
            eta: self.eta(),
            crosstrack: self.crosstrack(),
        }
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        let (position, waypoint, remaining_distance) = {
            let cursor = read(&self.shared.cursor);
            (
                cursor.position(),
                cursor.current().cloned(),
                cursor.remaining_distance(),
            )
        };
        NavigationSnapshot {
            enabled: self.is_enabled(),
            live: self.live_status(),
            position,
            route_len: self.shared.route.len(),
            waypoint,
            remaining_distance,
            metrics: self.metrics(),
        }
    }

    /// One distance monitor pass: waypoint fix, total distance, arrival check
    pub fn distance_tick(&self) -> Result<()> {
        self.shared.distance_tick()
    }

    /// One arrival monitor pass: ETA to waypoint and route end
    pub fn arrival_tick(&self) -> Result<()> {
        self.shared.arrival_tick()
    }

    /// One crosstrack monitor pass
    pub fn crosstrack_tick(&self) -> Result<()> {
        self.shared.crosstrack_tick()
    }
}

async fn run_monitor(shared: Arc<Shared>, monitor: Monitor, session: u64) {
    let interval = monitor.interval(&shared.settings);
    debug!("{} monitor started, every {:?}", monitor, interval);

    while shared.is_active(session) {
        guarded_tick(monitor, || shared.tick(monitor));
        tokio::time::sleep(interval).await;
    }

    debug!("{} monitor stopped", monitor);
}

/// Run one tick, logging errors and panics. Returns whether it succeeded.
fn guarded_tick<F>(monitor: Monitor, tick: F) -> bool
where
    F: FnOnce() -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(tick)) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!("{} monitor skipped a tick: {}", monitor, e);
            false
        }
        Err(_) => {
            error!("{} monitor tick panicked, continuing", monitor);
            false
        }
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::metrics::Side;
    use crate::route::RoutePoint;

    fn equator_engine() -> NavigationEngine {
        let route = Route::load(vec![
            RoutePoint::new(0.0, 0.0, "A"),
            RoutePoint::new(0.0, 1.0, "B"),
            RoutePoint::new(0.0, 2.0, "C"),
        ])
        .unwrap();
        NavigationEngine::new(route, EngineSettings::default())
    }

    fn fast_settings() -> EngineSettings {
        EngineSettings {
            distance_interval: Duration::from_millis(5),
            arrival_interval: Duration::from_millis(5),
            crosstrack_interval: Duration::from_millis(5),
            ..EngineSettings::default()
        }
    }

    fn name(engine: &NavigationEngine) -> String {
        engine.current_waypoint().map(|w| w.name).unwrap_or_default()
    }

    #[test]
    fn test_route_following_scenario() {
        let engine = equator_engine();
        engine.advance();
        assert_eq!(name(&engine), "A");

        // Sitting on A moves the cursor on to B
        engine.set_live_status(0.0, 0.0, 5.0);
        engine.distance_tick().unwrap();
        assert_eq!(name(&engine), "B");

        engine.set_live_status(0.0, 0.999, 5.0);
        engine.distance_tick().unwrap();
        let fix = engine.waypoint_fix();
        assert!((fix.distance - 0.06).abs() < 0.01, "distance {}", fix.distance);
        assert_eq!(name(&engine), "B");

        engine.set_live_status(0.0, 1.0001, 5.0);
        engine.distance_tick().unwrap();
        assert_eq!(name(&engine), "C");
    }

    #[test]
    fn test_total_distance_adds_remaining_legs() {
        let engine = equator_engine();
        engine.advance();
        engine.set_live_status(0.0, -0.5, 0.0);
        engine.distance_tick().unwrap();

        let fix = engine.waypoint_fix();
        let b_to_c = engine.route().waypoints()[1].distance_to_next;
        assert!((fix.total_distance - (fix.distance + b_to_c)).abs() < 1e-9);
        assert!((fix.bearing - 90.0).abs() < 1e-6);
        assert!(!fix.alarm);
    }

    #[test]
    fn test_holds_at_destination() {
        let engine = equator_engine();
        engine.advance();
        engine.advance();
        engine.advance();
        engine.set_live_status(0.0, 2.0, 3.0);
        engine.distance_tick().unwrap();
        engine.distance_tick().unwrap();
        assert_eq!(engine.cursor_position(), Some(2));
        assert!(engine.waypoint_fix().alarm);
    }

    #[test]
    fn test_tick_before_route_entered_is_noop() {
        let engine = equator_engine();
        engine.distance_tick().unwrap();
        engine.crosstrack_tick().unwrap();
        assert_eq!(engine.cursor_position(), None);
        assert_eq!(engine.waypoint_fix(), WaypointFix::default());
    }

    #[test]
    fn test_non_finite_position_skips_tick() {
        let engine = equator_engine();
        engine.advance();
        engine.set_live_status(0.0, -0.5, 4.0);
        engine.distance_tick().unwrap();
        let before = engine.waypoint_fix();

        engine.set_live_status(f64::NAN, 0.0, 4.0);
        assert!(matches!(engine.distance_tick(), Err(NavError::InvalidInput(_))));
        assert_eq!(engine.waypoint_fix(), before);
        assert_eq!(engine.cursor_position(), Some(0));
    }

    #[test]
    fn test_zero_speed_eta_unknown() {
        let engine = equator_engine();
        engine.advance();
        engine.set_live_status(0.0, -0.5, 0.0);
        engine.distance_tick().unwrap();
        engine.arrival_tick().unwrap();
        assert!(engine.eta().is_unknown());
    }

    #[test]
    fn test_eta_from_speed() {
        let engine = equator_engine();
        engine.advance();
        engine.advance(); // B
        engine.set_live_status(0.0, 0.0, 60.0);
        engine.distance_tick().unwrap();
        engine.arrival_tick().unwrap();

        let eta = engine.eta();
        let ttg = eta.waypoint.unwrap();
        // About 60 nm at 60 knots
        assert_eq!(ttg.hours, 1);
        assert!(ttg.minutes <= 1);
        assert!(eta.route_end.is_some());
    }

    #[test]
    fn test_crosstrack_zero_at_first_waypoint() {
        let engine = equator_engine();
        engine.advance();
        engine.set_live_status(3.0, -4.0, 5.0);
        engine.crosstrack_tick().unwrap();
        let xte = engine.crosstrack();
        assert_eq!(xte.distance, 0.0);
        assert_eq!(xte.side, Side::None);
    }

    #[test]
    fn test_crosstrack_sides_on_leg() {
        let engine = equator_engine();
        engine.advance();
        engine.advance(); // leg A -> B, course 090

        engine.set_live_status(0.05, 0.5, 5.0);
        engine.crosstrack_tick().unwrap();
        let left = engine.crosstrack();
        assert_eq!(left.side, Side::Left);
        assert!((left.distance - 3.0).abs() < 0.05, "xte {}", left.distance);
        assert!(left.alarm);

        engine.set_live_status(-0.01, 0.5, 5.0);
        engine.crosstrack_tick().unwrap();
        let right = engine.crosstrack();
        assert_eq!(right.side, Side::Right);
        assert!(!right.alarm);
    }

    #[test]
    fn test_retreat_resets_crosstrack_origin() {
        let engine = equator_engine();
        engine.advance();
        engine.advance();
        assert_eq!(engine.retreat().name, "A");
        engine.set_live_status(1.0, 0.5, 5.0);
        engine.crosstrack_tick().unwrap();
        assert_eq!(engine.crosstrack(), Crosstrack::NONE);
    }

    #[test]
    fn test_snapshot() {
        let engine = equator_engine();
        engine.advance();
        engine.set_live_status(0.0, -0.1, 2.0);
        let snapshot = engine.snapshot();
        assert!(!snapshot.enabled);
        assert_eq!(snapshot.position, Some(0));
        assert_eq!(snapshot.route_len, 3);
        assert_eq!(snapshot.live.speed, 2.0);
        assert_eq!(snapshot.waypoint.map(|w| w.name), Some("A".to_string()));
    }

    #[test]
    fn test_enable_requires_runtime() {
        let engine = equator_engine();
        assert!(engine.enable().is_err());
        assert!(!engine.is_enabled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_monitors_follow_route() {
        let route = Route::load(vec![
            RoutePoint::new(0.0, 0.0, "A"),
            RoutePoint::new(0.0, 1.0, "B"),
            RoutePoint::new(0.0, 2.0, "C"),
        ])
        .unwrap();
        let engine = NavigationEngine::new(route, fast_settings());
        engine.set_live_status(0.0, -0.5, 6.0);

        assert!(engine.enable().unwrap());
        assert!(!engine.enable().unwrap());
        assert_eq!(engine.cursor_position(), Some(0));

        engine.set_live_status(0.0, 0.0, 6.0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(name(&engine), "B");

        engine.set_live_status(0.0, 1.0, 6.0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(name(&engine), "C");

        engine.set_live_status(0.01, 1.5, 6.0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let metrics = engine.metrics();
        assert!(metrics.eta.waypoint.is_some());
        assert_eq!(metrics.crosstrack.side, Side::Left);

        engine.shutdown().await;
        assert!(!engine.is_enabled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reenable_resumes_cursor() {
        let route = Route::load(vec![
            RoutePoint::new(0.0, 0.0, "A"),
            RoutePoint::new(0.0, 1.0, "B"),
            RoutePoint::new(0.0, 2.0, "C"),
        ])
        .unwrap();
        let engine = NavigationEngine::new(route, fast_settings());
        engine.set_live_status(0.0, 0.0, 6.0);

        engine.enable().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        engine.shutdown().await;
        assert_eq!(name(&engine), "B");

        // Monitors are stopped, moving the vehicle changes nothing
        engine.set_live_status(0.0, 1.0, 6.0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(name(&engine), "B");

        engine.set_live_status(0.0, 0.5, 6.0);
        engine.enable().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(name(&engine), "B");
        engine.shutdown().await;
    }

    #[test]
    fn test_guarded_tick_contains_panic() {
        let engine = equator_engine();
        engine.advance();

        // A tick that panics while holding the cursor lock
        let ok = guarded_tick(Monitor::Distance, || {
            let _cursor = write(&engine.shared.cursor);
            panic!("tick blew up");
        });
        assert!(!ok);

        assert!(!guarded_tick(Monitor::Arrival, || Err(NavError::Other("skip".to_string()))));

        // The poisoned lock is recovered and the next tick runs normally
        engine.set_live_status(0.0, 0.0, 5.0);
        assert!(guarded_tick(Monitor::Distance, || engine.distance_tick()));
        assert_eq!(name(&engine), "B");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_monitors_survive_bad_sample_and_stop_on_disable() {
        let route = Route::load(vec![
            RoutePoint::new(0.0, 0.0, "A"),
            RoutePoint::new(0.0, 1.0, "B"),
            RoutePoint::new(0.0, 2.0, "C"),
        ])
        .unwrap();
        let engine = NavigationEngine::new(route, fast_settings());
        engine.set_live_status(0.0, -0.5, 5.0);
        engine.enable().unwrap();

        engine.set_live_status(f64::NAN, 0.0, 5.0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(name(&engine), "A");

        engine.set_live_status(0.0, 0.0, 5.0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(name(&engine), "B");

        // Let any in-flight tick finish before moving onto B
        engine.disable();
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.set_live_status(0.0, 1.0, 5.0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(name(&engine), "B");

        engine.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_awaits_earlier_session() {
        let settings = EngineSettings {
            distance_interval: Duration::from_millis(200),
            arrival_interval: Duration::from_millis(200),
            crosstrack_interval: Duration::from_millis(200),
            ..EngineSettings::default()
        };
        let engine = NavigationEngine::new(
            Route::load(vec![RoutePoint::new(0.0, 0.0, "A")]).unwrap(),
            settings,
        );

        engine.enable().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.disable();
        engine.enable().unwrap();
        // First session loops are still sleeping and stay tracked
        assert_eq!(lock(&engine.shared.tasks).len(), 6);

        engine.shutdown().await;
        assert!(lock(&engine.shared.tasks).is_empty());
        assert!(!engine.is_enabled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_toggle() {
        let engine = NavigationEngine::new(
            Route::load(vec![RoutePoint::new(0.0, 0.0, "A")]).unwrap(),
            fast_settings(),
        );
        assert!(engine.toggle().unwrap());
        assert!(engine.is_enabled());
        assert!(!engine.toggle().unwrap());
        assert!(!engine.is_enabled());
        engine.shutdown().await;
    }
}
