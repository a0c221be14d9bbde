//! Loadable module fixture: a periodic task that completes after two
//! iteration cycles. Built on demand by the loader tests.

use taskmill::{
    EnvironmentRef, Iteration, TaskBody, TaskDefinition, TaskDescriptor,
};

struct Pulse {
    descriptor: TaskDescriptor,
}

struct PulseBody {
    remaining: i64,
}

impl TaskBody for PulseBody {
    fn iterate(&mut self) -> Iteration {
        self.remaining -= 1;
        if self.remaining <= 0 {
            Iteration::Completed
        } else {
            Iteration::Running
        }
    }
}

impl TaskDefinition for Pulse {
    fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    fn spawn_body(&self) -> Box<dyn TaskBody> {
        Box::new(PulseBody { remaining: 2 })
    }
}

fn build(_environment: EnvironmentRef) -> Option<Box<dyn TaskDefinition>> {
    Some(Box::new(Pulse {
        descriptor: TaskDescriptor::new("Pulse", "Completes after two cycles", true, -1.0),
    }))
}

taskmill::declare_task!(build);
