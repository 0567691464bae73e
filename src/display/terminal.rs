// src/display/terminal.rs
//! Terminal dashboard for route following

use super::{format_bearing, format_nm};
use crate::{
    error::{NavError, Result},
    navigation::{NavigationEngine, NavigationSnapshot, Side},
};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::{
    io::{self, Write},
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use tokio::time::sleep;

pub struct TerminalDisplay {
    refresh: Duration,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self {
            refresh: Duration::from_secs(1),
        }
    }

    /// Redraw the engine snapshot until `running` is cleared
    pub async fn run(&self, engine: &NavigationEngine, running: &AtomicBool) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, Hide, DisableLineWrap).map_err(NavError::Io)?;

        let drawn = self.redraw_until_stopped(&mut stdout, engine, running).await;

        // Restore the terminal even when a redraw failed
        execute!(stdout, Show, EnableLineWrap).map_err(NavError::Io)?;
        println!("\nShutting down...");
        drawn
    }

    async fn redraw_until_stopped(
        &self,
        stdout: &mut io::Stdout,
        engine: &NavigationEngine,
        running: &AtomicBool,
    ) -> Result<()> {
        while running.load(Ordering::Relaxed) {
            execute!(stdout, Clear(ClearType::All), MoveTo(0, 0)).map_err(NavError::Io)?;

            self.render_display(stdout, &engine.snapshot())?;

            stdout.flush().map_err(NavError::Io)?;
            sleep(self.refresh).await;
        }
        Ok(())
    }

    /// Render a snapshot to any terminal-like writer
    pub fn render_display(&self, out: &mut impl Write, snapshot: &NavigationSnapshot) -> Result<()> {
        let mode = if snapshot.enabled { "ROUTE MODE" } else { "ROUTE MODE OFF" };
        execute!(
            out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\n"),
            Print(format!("Route Navigator - {}", mode)),
            Print("\n"),
            Print("=".repeat(60)),
            Print("\n\n"),
            ResetColor
        )
        .map_err(NavError::Io)?;

        self.render_waypoint_section(out, snapshot)?;
        self.render_arrival_section(out, snapshot)?;
        self.render_crosstrack_section(out, snapshot)?;
        self.render_position_section(out, snapshot)?;

        execute!(
            out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print("\n"),
            Print("Press Ctrl+C to exit"),
            Print("\n"),
            ResetColor
        )
        .map_err(NavError::Io)?;

        Ok(())
    }

    fn render_waypoint_section(&self, out: &mut impl Write, snapshot: &NavigationSnapshot) -> Result<()> {
        let fix = &snapshot.metrics.waypoint;
        let (name, index) = match (&snapshot.waypoint, snapshot.position) {
            (Some(waypoint), Some(position)) => (
                waypoint.name.clone(),
                format!("{}/{}", position + 1, snapshot.route_len),
            ),
            _ => ("No active waypoint".to_string(), format!("-/{}", snapshot.route_len)),
        };
        let color = if fix.alarm { Color::Red } else { Color::Yellow };

        execute!(
            out,
            SetForegroundColor(color),
            Print("WAYPOINT:\n"),
            ResetColor,
            Print(format!("  Name:      {:>13} ({})\n", name, index)),
            Print(format!("  Distance:  {}\n", format_nm(fix.distance))),
            Print(format!("  Bearing:   {}\n", format_bearing(fix.bearing))),
            Print(format!("  Remaining: {}\n\n", format_nm(fix.total_distance)))
        )
        .map_err(NavError::Io)?;

        Ok(())
    }

    fn render_arrival_section(&self, out: &mut impl Write, snapshot: &NavigationSnapshot) -> Result<()> {
        let eta = &snapshot.metrics.eta;
        execute!(
            out,
            SetForegroundColor(Color::Cyan),
            Print("ARRIVAL:\n"),
            ResetColor,
            Print(format!("  Waypoint:  {:>13}\n", eta.format_waypoint())),
            Print(format!("  Route end: {:>16}\n\n", eta.format_route_end()))
        )
        .map_err(NavError::Io)?;

        Ok(())
    }

    fn render_crosstrack_section(&self, out: &mut impl Write, snapshot: &NavigationSnapshot) -> Result<()> {
        let xte = &snapshot.metrics.crosstrack;
        let color = if xte.alarm { Color::Red } else { Color::Magenta };
        let side = match xte.side {
            Side::Left => "left",
            Side::Right => "right",
            Side::None => "on course",
        };

        execute!(
            out,
            SetForegroundColor(color),
            Print("CROSSTRACK:\n"),
            ResetColor,
            Print(format!("  Offset:    {} {}\n\n", format_nm(xte.distance), side))
        )
        .map_err(NavError::Io)?;

        Ok(())
    }

    fn render_position_section(&self, out: &mut impl Write, snapshot: &NavigationSnapshot) -> Result<()> {
        let live = &snapshot.live;
        execute!(
            out,
            SetForegroundColor(Color::Blue),
            Print("POSITION:\n"),
            ResetColor,
            Print(format!("  Latitude:  {:>12.6}°\n", live.latitude)),
            Print(format!("  Longitude: {:>12.6}°\n", live.longitude)),
            Print(format!("  Speed:     {:>10.1} kn\n\n", live.speed))
        )
        .map_err(NavError::Io)?;

        Ok(())
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}
