// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A small behavior tree used to drive `StrategyPlayer`.
//!
//! Composite nodes remember which child was `Running` across ticks instead
//! of restarting from the first child every time, so a multi-tick action
//! resumes where it left off. Ticking a tree never allocates; the tree
//! shape is built once and walked by reference.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::entity::Entity;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
    Running,
}

/// Typed scratch storage shared across one tree's ticks, keyed by the
/// stored type rather than a string so unrelated nodes can't collide.
#[derive(Default)]
pub struct Blackboard {
    values: HashMap<TypeId, Box<dyn Any>>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: 'static>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.values.get(&TypeId::of::<T>()).and_then(|v| v.downcast_ref())
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.values.get_mut(&TypeId::of::<T>()).and_then(|v| v.downcast_mut())
    }

    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.values.remove(&TypeId::of::<T>()).and_then(|v| v.downcast().ok()).map(|b| *b)
    }
}

/// What a leaf node sees when ticked: the world, the entity it acts on,
/// and the tree's blackboard.
pub struct Context<'a> {
    pub world: &'a World,
    pub entity: Entity,
    pub blackboard: &'a mut Blackboard,
}

pub type ConditionFn = Box<dyn Fn(&Context) -> bool + Send + Sync>;
pub type ActionFn = Box<dyn FnMut(&mut Context) -> Status + Send + Sync>;

/// A node in the tree. Composite node cursors are `Cell`-free: `tick`
/// takes `&mut self` so resuming a running child just means storing its
/// index back onto the node.
pub enum Node {
    Sequence { children: Vec<Node>, cursor: usize },
    Selector { children: Vec<Node>, cursor: usize },
    Inverter(Box<Node>),
    Repeater { child: Box<Node>, total: Option<u32>, remaining: Option<u32> },
    Condition(ConditionFn),
    Action(ActionFn),
    Succeed,
    Fail,
}

impl Node {
    pub fn sequence(children: Vec<Node>) -> Self {
        Node::Sequence { children, cursor: 0 }
    }

    pub fn selector(children: Vec<Node>) -> Self {
        Node::Selector { children, cursor: 0 }
    }

    pub fn inverter(child: Node) -> Self {
        Node::Inverter(Box::new(child))
    }

    /// `times: None` repeats forever (returns `Running` until a child fails).
    pub fn repeater(child: Node, times: Option<u32>) -> Self {
        Node::Repeater {
            child: Box::new(child),
            total: times,
            remaining: times,
        }
    }

    pub fn condition(f: impl Fn(&Context) -> bool + Send + Sync + 'static) -> Self {
        Node::Condition(Box::new(f))
    }

    pub fn action(f: impl FnMut(&mut Context) -> Status + Send + Sync + 'static) -> Self {
        Node::Action(Box::new(f))
    }

    pub fn tick(&mut self, ctx: &mut Context) -> Status {
        match self {
            Node::Sequence { children, cursor } => {
                while *cursor < children.len() {
                    match children[*cursor].tick(ctx) {
                        Status::Success => *cursor += 1,
                        Status::Running => return Status::Running,
                        Status::Failure => {
                            *cursor = 0;
                            return Status::Failure;
                        }
                    }
                }
                *cursor = 0;
                Status::Success
            }
            Node::Selector { children, cursor } => {
                while *cursor < children.len() {
                    match children[*cursor].tick(ctx) {
                        Status::Failure => *cursor += 1,
                        Status::Running => return Status::Running,
                        Status::Success => {
                            *cursor = 0;
                            return Status::Success;
                        }
                    }
                }
                *cursor = 0;
                Status::Failure
            }
            Node::Inverter(child) => match child.tick(ctx) {
                Status::Success => Status::Failure,
                Status::Failure => Status::Success,
                Status::Running => Status::Running,
            },
            Node::Repeater { child, total, remaining } => {
                if let Some(0) = total {
                    return Status::Success;
                }
                match child.tick(ctx) {
                    Status::Running => Status::Running,
                    Status::Failure => {
                        *remaining = *total;
                        Status::Failure
                    }
                    Status::Success => match remaining {
                        None => Status::Running,
                        Some(n) => {
                            *n -= 1;
                            if *n == 0 {
                                *remaining = *total;
                                Status::Success
                            } else {
                                Status::Running
                            }
                        }
                    },
                }
            }
            Node::Condition(f) => {
                if f(ctx) {
                    Status::Success
                } else {
                    Status::Failure
                }
            }
            Node::Action(f) => f(ctx),
            Node::Succeed => Status::Success,
            Node::Fail => Status::Failure,
        }
    }
}

/// Owns a root node and ticks it once per call.
pub struct BehaviorTree {
    root: Node,
}

impl BehaviorTree {
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    pub fn tick(&mut self, ctx: &mut Context) -> Status {
        self.root.tick(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(world: &'a World, entity: Entity, blackboard: &'a mut Blackboard) -> Context<'a> {
        Context { world, entity, blackboard }
    }

    #[test]
    fn sequence_resumes_running_child_instead_of_restarting() {
        let mut world = World::new();
        let entity = world.create_entity((0u8,));
        let mut blackboard = Blackboard::new();

        let mut calls = 0u32;
        let mut tree = BehaviorTree::new(Node::sequence(vec![
            Node::Succeed,
            Node::action(move |_| {
                calls += 1;
                if calls < 2 {
                    Status::Running
                } else {
                    Status::Success
                }
            }),
        ]));

        let status1 = tree.tick(&mut ctx(&world, entity, &mut blackboard));
        assert_eq!(status1, Status::Running);
        let status2 = tree.tick(&mut ctx(&world, entity, &mut blackboard));
        assert_eq!(status2, Status::Success);
    }

    #[test]
    fn inverter_flips_result() {
        let mut world = World::new();
        let entity = world.create_entity((0u8,));
        let mut blackboard = Blackboard::new();
        let mut tree = BehaviorTree::new(Node::inverter(Node::Succeed));
        assert_eq!(tree.tick(&mut ctx(&world, entity, &mut blackboard)), Status::Failure);
    }

    #[test]
    fn repeater_resets_its_counter_after_completing() {
        let mut world = World::new();
        let entity = world.create_entity((0u8,));
        let mut blackboard = Blackboard::new();
        let mut tree = BehaviorTree::new(Node::repeater(Node::Succeed, Some(2)));

        assert_eq!(tree.tick(&mut ctx(&world, entity, &mut blackboard)), Status::Running);
        assert_eq!(tree.tick(&mut ctx(&world, entity, &mut blackboard)), Status::Success);
        // Counter reset after completion: the next two ticks behave the same way.
        assert_eq!(tree.tick(&mut ctx(&world, entity, &mut blackboard)), Status::Running);
        assert_eq!(tree.tick(&mut ctx(&world, entity, &mut blackboard)), Status::Success);
    }

    #[test]
    fn repeater_resets_its_counter_after_a_failure() {
        let mut world = World::new();
        let entity = world.create_entity((0u8,));
        let mut blackboard = Blackboard::new();
        let mut tree = BehaviorTree::new(Node::repeater(Node::Fail, Some(3)));

        assert_eq!(tree.tick(&mut ctx(&world, entity, &mut blackboard)), Status::Failure);
        // A second failure behaves identically, proving the counter reset.
        assert_eq!(tree.tick(&mut ctx(&world, entity, &mut blackboard)), Status::Failure);
    }

    #[test]
    fn blackboard_round_trips_typed_values() {
        let mut blackboard = Blackboard::new();
        blackboard.set(42i32);
        assert_eq!(*blackboard.get::<i32>().unwrap(), 42);
        blackboard.set("hello".to_string());
        assert_eq!(blackboard.get::<String>().unwrap(), "hello");
    }
}
