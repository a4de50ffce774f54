//! Local stand-in for the streaming generation service. It accepts whatever
//! it is sent and echoes playback transitions back through the input queue
//! the way the real service reports them asynchronously.

use std::error::Error;

use promptdj::prelude::*;

pub struct EchoClient {
    inputs: InputSender,
    rejected: Vec<String>,
}

impl EchoClient {
    /// `rejected` lists prompt texts the client reports as filtered.
    pub fn new(inputs: InputSender, rejected: Vec<String>) -> Self {
        Self {
            inputs,
            rejected: rejected.into_iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    fn echo(&self, event: ClientEvent) -> Result<(), Box<dyn Error>> {
        self.inputs.send(Input::Client(event))?;
        Ok(())
    }

    fn state(&self, state: PlaybackState) -> Result<(), Box<dyn Error>> {
        self.echo(ClientEvent::PlaybackStateChanged(state))
    }
}

impl GenerationClient for EchoClient {
    fn set_weighted_prompts(
        &mut self,
        prompts: &[WeightedPrompt],
    ) -> Result<(), Box<dyn Error>> {
        info!("Generating from {}", describe(prompts));
        for prompt in prompts {
            if self.rejected.contains(&prompt.text.to_lowercase()) {
                self.echo(ClientEvent::FilteredPrompt {
                    text: prompt.text.clone(),
                    reason: "blocked by local filter".to_string(),
                })?;
            }
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), Box<dyn Error>> {
        self.state(PlaybackState::Loading)?;
        self.state(PlaybackState::Playing)
    }

    fn pause(&mut self) -> Result<(), Box<dyn Error>> {
        self.state(PlaybackState::Paused)
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        self.state(PlaybackState::Stopped)
    }
}

fn describe(prompts: &[WeightedPrompt]) -> String {
    prompts
        .iter()
        .map(|p| format!("{} ({:.2})", p.text, p.weight))
        .collect::<Vec<_>>()
        .join(", ")
}
