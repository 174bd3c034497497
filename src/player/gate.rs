// Buffering gate
// Holds the output suspended until enough audio is queued to ride out jitter.
// Only the initial ramp-up is gated; a running output is never paused again.

use crate::audio::{AudioDevice, DeviceState};
use crate::error::Result;

pub struct BufferingGate {
    target_secs: f64,
}

impl BufferingGate {
    pub fn new(target_secs: f64) -> Self {
        Self { target_secs: target_secs.max(0.0) }
    }

    /// Called after every push. Returns true when this call resumed output.
    pub fn on_push<D: AudioDevice>(&self, buffered_secs: f64, device: &mut D) -> Result<bool> {
        if buffered_secs >= self.target_secs && device.state() == DeviceState::Suspended {
            log::debug!(
                "buffered {:.3}s >= target {:.3}s, resuming output",
                buffered_secs, self.target_secs
            );
            device.resume()?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFrame;
    use crate::player::queue::FrameQueue;
    use crate::testing::FakeDevice;

    #[test]
    fn test_resumes_once_at_target() {
        let sample_rate = 44100;
        let frame_size = 1024;
        let gate = BufferingGate::new(200.0 / 1000.0);
        let mut queue = FrameQueue::new(2, sample_rate);
        let mut device = FakeDevice::suspended();

        let mut resumed_at = None;
        for i in 0..20 {
            queue.push(AudioFrame::new(vec![0.0; frame_size * 2]));
            if gate.on_push(queue.buffered_secs(), &mut device).unwrap() {
                assert!(resumed_at.is_none());
                resumed_at = Some(i);
            }
        }

        // 1024 / 44100 = 23.2 ms per frame, so the 9th push crosses 200 ms
        assert_eq!(resumed_at, Some(8));
        assert_eq!(device.inner.lock().resumes, 1);
        assert_eq!(device.state(), DeviceState::Running);
    }

    #[test]
    fn test_zero_latency_resumes_on_first_push() {
        let gate = BufferingGate::new(0.0);
        let mut device = FakeDevice::suspended();
        assert!(gate.on_push(0.001, &mut device).unwrap());
    }

    #[test]
    fn test_ignores_running_and_closed_output() {
        let gate = BufferingGate::new(0.1);
        let mut device = FakeDevice::running();
        assert!(!gate.on_push(1.0, &mut device).unwrap());

        device.close().unwrap();
        assert!(!gate.on_push(1.0, &mut device).unwrap());
        assert_eq!(device.inner.lock().resumes, 0);
    }
}
