//! Headless backend.
//!
//! Replays a script of decoded events through the compositor core, standing
//! in for a real display server.

use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::thread;
use std::time::Duration;

use calloop::channel::{self, Channel};
use calloop::signals::{Signal, Signals};
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopHandle, RegistrationToken};
use strata_ipc::Event;
use tracing::{debug, error, info};

use crate::protocol::{OutputId, Request};
use crate::strata::Strata;

/// Script line after parsing.
type ScriptEvent = Result<Event, Box<dyn Error + Send + Sync>>;

/// Event loop state.
struct Headless {
    strata: Strata,
    event_loop: LoopHandle<'static, Self>,
    scheduled_frames: HashMap<OutputId, RegistrationToken>,
    frame_interval: Option<Duration>,
    input_closed: bool,
    frames: u64,
}

impl Headless {
    /// Forward requests to their consumers.
    ///
    /// Without clients or a renderer, most requests are only logged.
    fn process_requests(&mut self) {
        for request in self.strata.drain_requests() {
            match request {
                Request::ScheduleFrame { output } => self.schedule_frame(output),
                Request::ProtocolError { client, error } => {
                    error!("Client {} protocol error: {error}", client.0);
                },
                Request::ChangeVt(vt) => info!("VT switch to {vt} requested"),
                Request::Terminate => info!("Termination requested"),
                request => debug!("{request:?}"),
            }
        }
    }

    /// Request a frame once the output's frame interval has passed.
    fn schedule_frame(&mut self, output: OutputId) {
        if self.scheduled_frames.contains_key(&output) {
            return;
        }

        let interval = match self.strata.outputs.get(output) {
            Some(output) => self.frame_interval.unwrap_or_else(|| output.frame_interval()),
            None => return,
        };

        let timer = Timer::from_duration(interval);
        let token = self.event_loop.insert_source(timer, move |_, _, headless| {
            headless.scheduled_frames.remove(&output);
            headless.render(output);
            TimeoutAction::Drop
        });

        match token {
            Ok(token) => {
                self.scheduled_frames.insert(output, token);
            },
            Err(err) => error!("Unable to schedule frame: {}", err.error),
        }
    }

    /// Take an output's damage and report what would be drawn.
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn render(&mut self, output: OutputId) {
        let damage = match self.strata.outputs.get_mut(output) {
            Some(output) => output.damage.take_and_clear(),
            None => return,
        };
        debug!("Output {} damage: {:?}", output.0, damage.bounding_box());

        let elements = self.strata.render_elements(output);
        debug!("Output {} frame with {} surfaces", output.0, elements.len());
        self.frames += 1;

        #[cfg(feature = "profiling")]
        profiling::finish_frame!();
    }

    /// Cancel all pending frames.
    fn cancel_frames(&mut self) {
        for (_, token) in self.scheduled_frames.drain() {
            self.event_loop.remove(token);
        }
    }
}

/// Replay an event script.
pub fn run(script: &Path, frame_interval: Option<Duration>) -> Result<(), Box<dyn Error>> {
    let file = File::open(script)
        .map_err(|err| format!("unable to open {}: {err}", script.display()))?;

    let mut event_loop = EventLoop::try_new()?;
    let mut headless = Headless {
        event_loop: event_loop.handle(),
        scheduled_frames: HashMap::new(),
        strata: Strata::new(),
        input_closed: false,
        frame_interval,
        frames: 0,
    };

    // Feed script events into the loop.
    let events = spawn_reader(BufReader::new(file));
    event_loop
        .handle()
        .insert_source(events, |event, _, headless| match event {
            channel::Event::Msg(Ok(event)) => headless.strata.handle_event(event),
            channel::Event::Msg(Err(err)) => error!("Skipping invalid event: {err}"),
            channel::Event::Closed => headless.input_closed = true,
        })
        .map_err(|err| err.error)?;

    // Shut down gracefully on interrupt.
    let signals = Signals::new(&[Signal::SIGINT, Signal::SIGTERM])?;
    event_loop
        .handle()
        .insert_source(signals, |signal, _, headless| {
            info!("Received {:?}", signal.signal());
            headless.strata.terminate();
        })
        .map_err(|err| err.error)?;

    while !headless.strata.terminated() {
        event_loop.dispatch(None, &mut headless)?;
        headless.process_requests();

        if headless.input_closed && headless.scheduled_frames.is_empty() {
            break;
        }
    }

    headless.cancel_frames();

    info!("Replay finished after {} frames", headless.frames);

    Ok(())
}

/// Read script events on a separate thread.
fn spawn_reader<R>(reader: R) -> Channel<ScriptEvent>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = channel::channel();
    thread::spawn(move || {
        for event in strata_ipc::read_events(reader) {
            if tx.send(event).is_err() {
                break;
            }
        }
    });
    rx
}
