// ==========================================
// 食品加工追溯系统 - 自动保存状态机
// ==========================================
// Idle --edit--> Dirty --timer--> Saving --done--> Idle
// Dirty --teardown--> Saving (强制刷新)
// Saving --edit--> Saving (标记追加一轮, 完成后回到 Dirty 并重新计时)
// 进行中的保存不会被取消
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutosaveState {
    Idle,
    Dirty,
    Saving,
}

/// 状态转移后需要执行的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveAction {
    /// 无动作
    Nothing,
    /// (重新) 启动防抖计时
    ArmTimer,
    /// 立即开始保存
    StartSave,
}

#[derive(Debug, Clone)]
pub struct AutosaveMachine {
    state: AutosaveState,
    follow_up: bool,
}

impl Default for AutosaveMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl AutosaveMachine {
    pub fn new() -> Self {
        Self {
            state: AutosaveState::Idle,
            follow_up: false,
        }
    }

    pub fn state(&self) -> AutosaveState {
        self.state
    }

    /// 是否已标记追加一轮保存
    pub fn has_follow_up(&self) -> bool {
        self.follow_up
    }

    pub fn on_edit(&mut self) -> AutosaveAction {
        match self.state {
            AutosaveState::Idle | AutosaveState::Dirty => {
                self.state = AutosaveState::Dirty;
                AutosaveAction::ArmTimer
            }
            AutosaveState::Saving => {
                self.follow_up = true;
                AutosaveAction::Nothing
            }
        }
    }

    pub fn on_timer(&mut self) -> AutosaveAction {
        match self.state {
            AutosaveState::Dirty => {
                self.state = AutosaveState::Saving;
                AutosaveAction::StartSave
            }
            _ => AutosaveAction::Nothing,
        }
    }

    /// 页面卸载 / 显式 flush: 脏数据立即保存
    pub fn on_teardown(&mut self) -> AutosaveAction {
        self.on_timer()
    }

    /// 保存结束 (成功或失败都回到 Idle, 失败不重试)
    pub fn on_save_finished(&mut self) -> AutosaveAction {
        if self.state != AutosaveState::Saving {
            return AutosaveAction::Nothing;
        }
        if self.follow_up {
            self.follow_up = false;
            self.state = AutosaveState::Dirty;
            AutosaveAction::ArmTimer
        } else {
            self.state = AutosaveState::Idle;
            AutosaveAction::Nothing
        }
    }
}
