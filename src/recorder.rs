// 幀追蹤紀錄 - 透過 channel 把「幀完成」通知送到紀錄端

use crossbeam::channel::{Receiver, Sender, unbounded};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    Finished { frame: u64 },
}

#[derive(Debug)]
pub struct FrameRecorder {
    sender: Sender<FrameEvent>,
    frames: u64,
}

impl FrameRecorder {
    pub fn new(sender: Sender<FrameEvent>) -> Self {
        FrameRecorder { sender, frames: 0 }
    }

    /// 建立紀錄器與接收端
    pub fn channel() -> (Self, Receiver<FrameEvent>) {
        let (tx, rx) = unbounded();
        (FrameRecorder::new(tx), rx)
    }

    pub fn frame_finished(&mut self) {
        let frame = self.frames;
        self.frames += 1;
        // 接收端已關閉就直接丟棄
        let _ = self.sender.send(FrameEvent::Finished { frame });
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
