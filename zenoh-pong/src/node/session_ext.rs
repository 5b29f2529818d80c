use std::sync::Arc;

use zenoh::Resolvable;

use crate::config::{GameConfig, NodeConfig, Redundancy, RolePolicy};
use crate::error::Result;
use crate::network::{BusStats, ZenohBus};
use crate::node::pong_node::PongNode;
use crate::node::{InputSource, RenderSink};
use crate::types::{BusId, NodeId};

/// Extension trait for zenoh::Session to add pong node declaration
pub trait SessionExt {
    /// Declare a pong node playing over this session
    ///
    /// # Example
    /// ```no_run
    /// use zenoh_pong::{InputSample, InputSource, SessionExt};
    ///
    /// struct Idle;
    /// impl InputSource for Idle {
    ///     fn poll(&mut self) -> InputSample {
    ///         InputSample::default()
    ///     }
    /// }
    ///
    /// # async fn example() {
    /// let session = zenoh::open(zenoh::Config::default()).await.unwrap();
    /// let mut node = session
    ///     .declare_pong_node(Idle, ())
    ///     .name("paddle_one".to_string())
    ///     .unwrap()
    ///     .await
    ///     .unwrap();
    /// node.run().await.unwrap();
    /// # }
    /// ```
    fn declare_pong_node<I, R>(&self, input: I, render: R) -> PongNodeBuilder<'_, I, R>
    where
        I: InputSource,
        R: RenderSink;
}

impl SessionExt for zenoh::Session {
    fn declare_pong_node<I, R>(&self, input: I, render: R) -> PongNodeBuilder<'_, I, R>
    where
        I: InputSource,
        R: RenderSink,
    {
        PongNodeBuilder::new(self, input, render)
    }
}

/// Builder for pong nodes
///
/// Allows configuring the node before creating it, similar to zenoh's builder pattern.
#[must_use = "Resolvables do nothing unless you resolve them using `.await` or `zenoh::Wait::wait`"]
pub struct PongNodeBuilder<'a, I, R> {
    session: &'a zenoh::Session,
    input: I,
    render: R,
    config: NodeConfig,
}

impl<'a, I: InputSource, R: RenderSink> PongNodeBuilder<'a, I, R> {
    fn new(session: &'a zenoh::Session, input: I, render: R) -> Self {
        Self {
            session,
            input,
            render,
            config: NodeConfig::default(),
        }
    }

    /// Set the node name
    pub fn name(mut self, name: String) -> Result<Self> {
        self.config.node_id = NodeId::from_name(name)?;
        Ok(self)
    }

    /// Set the tie-break identifier carried in role claims
    pub fn bus_id(mut self, bus_id: BusId) -> Self {
        self.config.bus_id = bus_id;
        self
    }

    /// Become authority at once, or never claim
    pub fn role_policy(mut self, policy: RolePolicy) -> Self {
        self.config.role_policy = policy;
        self
    }

    /// Set the control loop period in milliseconds
    pub fn tick_interval_ms(mut self, tick_interval_ms: u64) -> Self {
        self.config.tick_interval_ms = tick_interval_ms;
        self
    }

    /// Use the identifier group `group` (default 6)
    pub fn group(mut self, group: u16) -> Result<Self> {
        self.config = self.config.with_group(group)?;
        Ok(self)
    }

    /// Set the retransmission of role claims and reset requests
    pub fn redundancy(mut self, redundancy: Redundancy) -> Self {
        self.config.redundancy = redundancy;
        self
    }

    /// Set the claim beacon period in ticks (0 disables)
    pub fn claim_beacon_ticks(mut self, ticks: u32) -> Self {
        self.config.claim_beacon_ticks = ticks;
        self
    }

    /// Set the key expression prefix
    pub fn prefix(mut self, prefix: String) -> Self {
        self.config.keyexpr_prefix = prefix;
        self
    }

    /// Set the game rules
    pub fn game(mut self, game: GameConfig) -> Self {
        self.config.game = game;
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }
}

impl<'a, I: InputSource, R: RenderSink> Resolvable for PongNodeBuilder<'a, I, R> {
    type To = Result<PongNode<ZenohBus, I, R>>;
}

impl<'a, I, R> std::future::IntoFuture for PongNodeBuilder<'a, I, R>
where
    I: InputSource + Send + 'a,
    R: RenderSink + Send + 'a,
{
    type Output = <Self as Resolvable>::To;
    type IntoFuture =
        std::pin::Pin<Box<dyn std::future::Future<Output = Self::Output> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            self.config.validate()?;
            let stats = Arc::new(BusStats::new());
            let bus = ZenohBus::declare(
                self.session,
                &self.config.keyexpr_prefix,
                self.config.node_id.clone(),
                stats.clone(),
            )
            .await?;
            PongNode::new(self.config, bus, self.input, self.render, stats)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PongError;
    use crate::node::pong_node::StepResult;
    use crate::node::InputSample;
    use crate::types::{Intent, NodeRole};

    struct Hold(Intent);

    impl InputSource for Hold {
        fn poll(&mut self) -> InputSample {
            InputSample::moving(self.0)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_node_creation_with_custom_name() {
        let session = zenoh::open(zenoh::Config::default()).await.unwrap();

        let node = session
            .declare_pong_node(Hold(Intent::Still), ())
            .name("my_custom_node".to_string())
            .unwrap()
            .prefix("test/session_ext/custom".to_string())
            .await
            .unwrap();
        assert_eq!(node.id().as_str(), "my_custom_node");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_node_creation_with_invalid_name() {
        let session = zenoh::open(zenoh::Config::default()).await.unwrap();

        let builder_result = session
            .declare_pong_node(Hold(Intent::Still), ())
            .name("invalid/name".to_string());

        match builder_result {
            Err(PongError::InvalidNodeName(_)) => {}
            Err(other) => panic!("Expected InvalidNodeName error, got {:?}", other),
            Ok(_) => panic!("Expected InvalidNodeName error"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_invalid_game_is_rejected() {
        let session = zenoh::open(zenoh::Config::default()).await.unwrap();

        let result = session
            .declare_pong_node(Hold(Intent::Still), ())
            .game(GameConfig {
                winning_score: 0,
                ..GameConfig::default()
            })
            .await;
        assert!(matches!(result, Err(PongError::InvalidConfig(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_forced_authority_over_zenoh() {
        let session = zenoh::open(zenoh::Config::default()).await.unwrap();

        let mut node = session
            .declare_pong_node(Hold(Intent::Still), ())
            .prefix("test/session_ext/forced".to_string())
            .role_policy(RolePolicy::ForceAuthority)
            .tick_interval_ms(1)
            .await
            .unwrap();

        assert_eq!(
            node.step().await.unwrap(),
            StepResult::RoleChanged(NodeRole::Authority)
        );
    }
}
