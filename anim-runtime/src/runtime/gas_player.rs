//! # GasPlayer 模块
//!
//! 每个角色一个的 GAS 解释器。
//!
//! ## 执行模型
//!
//! ```text
//! tick(dt, input, player):
//!   1. 处理输入 / 检查等待（时间、动画、走动）
//!   2. 仍在等待：返回
//!   3. 逐个执行节点，直到产生等待、脚本结束或达到单次 tick 的节点上限
//! ```
//!
//! 节点执行前先做概率判定，未通过的节点直接跳过。

use std::sync::Arc;

use rand::rngs::StdRng;
use tracing::{debug, warn};

use super::{AnimationPlayer, Executor, frame_delta, make_rng, passes_chance};
use crate::command::Command;
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::gas::AutoScript;
use crate::input::GasInput;
use crate::state::{GasState, WaitingReason};

/// 一次 tick 的输出
#[derive(Debug, Default, PartialEq)]
pub struct GasTick {
    pub commands: Vec<Command>,
    /// tick 结束时的等待原因
    pub waiting: WaitingReason,
    /// 脚本在本次 tick 中结束（只报告一次）
    pub finished: bool,
}

/// GAS 解释器
pub struct GasPlayer {
    script: Arc<AutoScript>,
    state: GasState,
    executor: Executor,
    rng: StdRng,
    max_nodes_per_tick: usize,
    /// 循环保护的警告只打印一次
    loop_guard_logged: bool,
}

impl GasPlayer {
    /// 创建解释器
    pub fn new(actor: impl Into<String>, script: Arc<AutoScript>, config: &RuntimeConfig) -> Self {
        let executor = Executor::new(actor);
        debug!(actor = executor.actor(), script = script.name(), "创建 GAS 解释器");
        Self {
            script,
            state: GasState::new(),
            executor,
            rng: make_rng(config.seed),
            max_nodes_per_tick: config.max_nodes_per_tick.max(1),
            loop_guard_logged: false,
        }
    }

    pub fn actor(&self) -> &str {
        self.executor.actor()
    }

    pub fn script(&self) -> &AutoScript {
        &self.script
    }

    pub fn state(&self) -> &GasState {
        &self.state
    }

    pub fn waiting(&self) -> WaitingReason {
        self.state.waiting
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// 推进解释器
    ///
    /// `player` 用于播放 ANIM / ONEOF 选中的时间轴，并检查其是否结束。
    pub fn tick(
        &mut self,
        delta_time: f32,
        input: Option<GasInput>,
        player: &mut AnimationPlayer,
    ) -> Result<GasTick, RuntimeError> {
        if let Some(input) = input {
            self.handle_input(input)?;
        }
        if self.state.finished {
            return Ok(GasTick::default());
        }

        // 1. 检查等待
        match self.state.waiting {
            WaitingReason::None => {}
            WaitingReason::Time { remaining } => {
                let remaining = remaining - frame_delta(delta_time);
                if remaining > 0.0 {
                    self.state.wait(WaitingReason::time(remaining));
                    return Ok(self.waiting_tick(Vec::new()));
                }
                self.state.clear_wait();
            }
            WaitingReason::Animation(id) => {
                if player.is_playing(id) {
                    return Ok(self.waiting_tick(Vec::new()));
                }
                self.state.clear_wait();
            }
            WaitingReason::Walk => return Ok(self.waiting_tick(Vec::new())),
        }

        // 2. 执行节点
        let mut commands = Vec::new();
        let mut evaluated = 0;
        loop {
            let Some(node) = self.script.node(self.state.position) else {
                return Ok(self.finish(commands));
            };

            if evaluated >= self.max_nodes_per_tick {
                if !self.loop_guard_logged {
                    warn!(
                        actor = self.actor(),
                        script = self.script.name(),
                        limit = self.max_nodes_per_tick,
                        "单次 tick 执行的节点数达到上限，让出到下一个 tick"
                    );
                    self.loop_guard_logged = true;
                }
                return Ok(self.waiting_tick(commands));
            }
            evaluated += 1;

            if !passes_chance(node.chance, &mut self.rng) {
                self.state.position += 1;
                continue;
            }

            let result = self.executor.execute(
                &node.kind,
                &mut self.state,
                &self.script,
                player,
                &mut self.rng,
            );
            commands.extend(result.commands);

            if result.end {
                return Ok(self.finish(commands));
            }
            if let Some(target) = result.jump_to {
                self.state.position = target;
                continue;
            }

            self.state.position += 1;

            if let Some(reason) = result.waiting {
                self.state.wait(reason);
                return Ok(self.waiting_tick(commands));
            }
        }
    }

    /// 处理输入，解除等待状态
    pub fn handle_input(&mut self, input: GasInput) -> Result<(), RuntimeError> {
        if self.state.finished {
            return Err(RuntimeError::ScriptEnded);
        }
        match (self.state.waiting, input) {
            (WaitingReason::Walk, GasInput::WalkFinished) => {
                self.state.clear_wait();
                Ok(())
            }
            (waiting, GasInput::WalkFinished) => Err(RuntimeError::StateMismatch {
                expected: WaitingReason::Walk.label().to_string(),
                actual: waiting.label().to_string(),
            }),
        }
    }

    /// 中止脚本：停止正在等待的时间轴，不报告结束
    pub fn stop(&mut self, player: &mut AnimationPlayer) {
        if let WaitingReason::Animation(id) = self.state.waiting {
            player.stop_playback(id);
        }
        self.state.clear_wait();
        self.state.finished = true;
    }

    /// 从头开始，变量清零
    pub fn restart(&mut self, player: &mut AnimationPlayer) {
        if let WaitingReason::Animation(id) = self.state.waiting {
            player.stop_playback(id);
        }
        self.state = GasState::new();
        self.loop_guard_logged = false;
    }

    fn waiting_tick(&self, commands: Vec<Command>) -> GasTick {
        GasTick {
            commands,
            waiting: self.state.waiting,
            finished: false,
        }
    }

    fn finish(&mut self, commands: Vec<Command>) -> GasTick {
        self.state.finished = true;
        self.state.clear_wait();
        debug!(actor = self.actor(), script = self.script.name(), "GAS 脚本结束");
        GasTick {
            commands,
            waiting: WaitingReason::None,
            finished: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::{Variable, WalkTarget};
    use crate::resolver::{AssetResolver, MemoryResolver, NullResolver};
    use crate::timeline::{AnimEvent, AnimNode, Animation};

    fn config() -> RuntimeConfig {
        RuntimeConfig {
            seed: Some(42),
            default_frame_rate: 10,
            max_nodes_per_tick: 32,
            ..RuntimeConfig::default()
        }
    }

    fn gas(text: &str, resolver: &MemoryResolver) -> GasPlayer {
        let script = Arc::new(AutoScript::parse("test", text, resolver));
        GasPlayer::new("gabriel", script, &config())
    }

    fn var(name: &str) -> Variable {
        Variable::from_name(name).unwrap()
    }

    #[test]
    fn test_sequential_then_finish_once() {
        let resolver = MemoryResolver::new();
        let mut gas = gas("SET a 2\nINC a 3\nUSEIPOS chair\n", &resolver);
        let mut player = AnimationPlayer::new(&config());

        let tick = gas.tick(0.1, None, &mut player).unwrap();
        assert!(tick.finished);
        assert_eq!(
            tick.commands,
            [Command::UseIPos {
                actor: "gabriel".to_string(),
                name: "chair".to_string()
            }]
        );
        assert_eq!(gas.state().get(var("a")), 5);

        let tick = gas.tick(0.1, None, &mut player).unwrap();
        assert!(!tick.finished);
        assert!(tick.commands.is_empty());
        assert!(gas.is_finished());
    }

    #[test]
    fn test_empty_script_finishes_once() {
        let resolver = MemoryResolver::new();
        let mut gas = gas("// 空脚本\n", &resolver);
        let mut player = AnimationPlayer::default();
        assert!(gas.tick(0.0, None, &mut player).unwrap().finished);
        assert!(!gas.tick(0.0, None, &mut player).unwrap().finished);
    }

    #[test]
    fn test_if_branches_and_falls_through() {
        let text = "\
SET a 1
IF a == 2 skip
SET b 10
LABEL skip
IF a < 5 done
SET c 99
LABEL done
";
        let resolver = MemoryResolver::new();
        let mut gas = gas(text, &resolver);
        let mut player = AnimationPlayer::default();
        assert!(gas.tick(0.0, None, &mut player).unwrap().finished);
        assert_eq!(gas.state().get(var("b")), 10);
        assert_eq!(gas.state().get(var("c")), 0);
    }

    #[test]
    fn test_empty_goto_loops_to_start() {
        let resolver = MemoryResolver::new();
        let mut gas = gas("INC a\nWAIT 1\nGOTO\n", &resolver);
        let mut player = AnimationPlayer::default();

        let tick = gas.tick(0.0, None, &mut player).unwrap();
        assert_eq!(tick.waiting, WaitingReason::time(1.0));
        assert_eq!(gas.state().get(var("a")), 1);

        // 等待未结束
        let tick = gas.tick(0.5, None, &mut player).unwrap();
        assert!(tick.waiting.is_waiting());
        assert_eq!(gas.state().get(var("a")), 1);

        // 等待结束 → GOTO → 回到开头
        let tick = gas.tick(0.5, None, &mut player).unwrap();
        assert!(!tick.finished);
        assert_eq!(gas.state().get(var("a")), 2);
        assert_eq!(gas.state().position, 2);
    }

    #[test]
    fn test_wait_duration_within_bounds() {
        let resolver = MemoryResolver::new();
        let mut gas = gas("WAIT 2 4\n", &resolver);
        let mut player = AnimationPlayer::default();
        let tick = gas.tick(0.0, None, &mut player).unwrap();
        let WaitingReason::Time { remaining } = tick.waiting else {
            panic!("期望时间等待");
        };
        assert!((2.0..=4.0).contains(&remaining), "remaining = {remaining}");
    }

    #[test]
    fn test_non_finite_delta_keeps_waiting() {
        let resolver = MemoryResolver::new();
        let mut gas = gas("WAIT 1\nSET a 1\n", &resolver);
        let mut player = AnimationPlayer::default();
        gas.tick(0.0, None, &mut player).unwrap();

        let tick = gas.tick(f32::NAN, None, &mut player).unwrap();
        assert_eq!(tick.waiting, WaitingReason::time(1.0));
        assert_eq!(gas.state().get(var("a")), 0);

        let tick = gas.tick(1.0, None, &mut player).unwrap();
        assert!(tick.finished);
        assert_eq!(gas.state().get(var("a")), 1);
    }

    #[test]
    fn test_unknown_label_ends_script() {
        let resolver = MemoryResolver::new();
        let mut gas = gas("GOTO nowhere\nSET a 1\n", &resolver);
        let mut player = AnimationPlayer::default();
        let tick = gas.tick(0.0, None, &mut player).unwrap();
        assert!(tick.finished);
        assert_eq!(gas.state().get(var("a")), 0);
    }

    #[test]
    fn test_chance_zero_node_is_skipped() {
        let resolver = MemoryResolver::new();
        let mut gas = gas("SET a 1 random=0\nSET b 1 random=100\n", &resolver);
        let mut player = AnimationPlayer::default();
        assert!(gas.tick(0.0, None, &mut player).unwrap().finished);
        assert_eq!(gas.state().get(var("a")), 0);
        assert_eq!(gas.state().get(var("b")), 1);
    }

    #[test]
    fn test_null_animation_is_noop() {
        let resolver = MemoryResolver::new();
        let mut gas = gas("ANIM missing\nSET a 1\n", &resolver);
        let mut player = AnimationPlayer::default();
        assert!(gas.tick(0.0, None, &mut player).unwrap().finished);
        assert_eq!(player.active_count(), 0);
        assert_eq!(gas.state().get(var("a")), 1);
    }

    #[test]
    fn test_waits_for_animation() {
        let mut anim = Animation::new("gab_scratch", 2);
        anim.push(AnimNode::new(
            2,
            AnimEvent::Footstep {
                actor: "gabriel".to_string(),
            },
        ));
        let mut resolver = MemoryResolver::new();
        resolver.insert_animation(Arc::new(anim));

        let mut gas = gas("ANIM gab_scratch\nSET a 1\n", &resolver);
        let mut player = AnimationPlayer::new(&config());

        let tick = gas.tick(0.0, None, &mut player).unwrap();
        let WaitingReason::Animation(id) = tick.waiting else {
            panic!("期望动画等待");
        };
        assert!(player.is_playing(id));

        // 第 1 帧
        player.update(0.0);
        assert!(gas.tick(0.0, None, &mut player).unwrap().waiting.is_waiting());

        // 第 2 帧，播放结束
        let frame = player.update(0.1);
        assert_eq!(frame.finished, [id]);
        assert_eq!(frame.commands.len(), 1);

        let tick = gas.tick(0.1, None, &mut player).unwrap();
        assert!(tick.finished);
        assert_eq!(gas.state().get(var("a")), 1);
    }

    #[test]
    fn test_walk_waits_for_input() {
        let resolver = MemoryResolver::new();
        let mut gas = gas("WALKTO door\nSET a 1\n", &resolver);
        let mut player = AnimationPlayer::default();

        let tick = gas.tick(0.0, None, &mut player).unwrap();
        assert_eq!(tick.waiting, WaitingReason::Walk);
        assert_eq!(
            tick.commands,
            [Command::WalkTo {
                actor: "gabriel".to_string(),
                target: WalkTarget::Named("door".to_string())
            }]
        );

        // 没有输入时一直等待
        let tick = gas.tick(10.0, None, &mut player).unwrap();
        assert_eq!(tick.waiting, WaitingReason::Walk);

        let tick = gas
            .tick(0.0, Some(GasInput::walk_finished()), &mut player)
            .unwrap();
        assert!(tick.finished);
        assert_eq!(gas.state().get(var("a")), 1);
    }

    #[test]
    fn test_input_state_mismatch() {
        let resolver = MemoryResolver::new();
        let mut gas = gas("WAIT 5\n", &resolver);
        let mut player = AnimationPlayer::default();
        gas.tick(0.0, None, &mut player).unwrap();

        let err = gas
            .tick(0.0, Some(GasInput::WalkFinished), &mut player)
            .unwrap_err();
        assert_eq!(
            err,
            RuntimeError::StateMismatch {
                expected: "Walk".to_string(),
                actual: "Time".to_string()
            }
        );
    }

    #[test]
    fn test_loop_guard_yields() {
        let resolver = MemoryResolver::new();
        let mut gas = gas("LABEL spin\nINC a\nGOTO spin\n", &resolver);
        let mut player = AnimationPlayer::default();

        let tick = gas.tick(0.0, None, &mut player).unwrap();
        assert!(!tick.finished);
        assert!(!tick.waiting.is_waiting());
        let first = gas.state().get(var("a"));
        assert!(first > 0);

        gas.tick(0.0, None, &mut player).unwrap();
        assert!(gas.state().get(var("a")) > first);
    }

    #[test]
    fn test_one_of_plays_weighted_choice() {
        let mut resolver = MemoryResolver::new();
        resolver.insert_animation(Arc::new(Animation::new("a", 1)));
        resolver.insert_animation(Arc::new(Animation::new("b", 1)));

        let mut gas = gas("ONEOF a=0 b=1\n", &resolver);
        let mut player = AnimationPlayer::default();
        let tick = gas.tick(0.0, None, &mut player).unwrap();
        assert!(matches!(tick.waiting, WaitingReason::Animation(_)));

        let b = resolver.animation("b").unwrap();
        assert_eq!(player.stop(&b), 1);
    }

    #[test]
    fn test_stop_cancels_playback() {
        let mut resolver = MemoryResolver::new();
        resolver.insert_animation(Arc::new(Animation::new("long", 100)));
        let mut gas = gas("ANIM long\n", &resolver);
        let mut player = AnimationPlayer::default();

        gas.tick(0.0, None, &mut player).unwrap();
        assert_eq!(player.active_count(), 1);

        gas.stop(&mut player);
        assert_eq!(player.active_count(), 0);
        assert!(gas.is_finished());
        assert!(!gas.tick(0.0, None, &mut player).unwrap().finished);

        gas.restart(&mut player);
        assert!(!gas.is_finished());
        assert_eq!(gas.state().position, 0);
    }

    #[test]
    fn test_null_resolver_script() {
        let script = Arc::new(AutoScript::parse("n", "ANIM x\n", &NullResolver));
        let mut gas = GasPlayer::new("mosely", script, &config());
        let mut player = AnimationPlayer::default();
        assert!(gas.tick(0.0, None, &mut player).unwrap().finished);
        assert_eq!(gas.actor(), "mosely");
    }
}
