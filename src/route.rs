use crate::hand::{Hand, Handedness, Landmarks, DEFAULT_RECORD};

/// The UDP port each hand is streamed to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Destinations {
    pub(crate) right: u16,
    pub(crate) left: u16,
}

impl Destinations {
    pub(crate) fn port(&self, handedness: Handedness) -> u16 {
        match handedness {
            Handedness::Right => self.right,
            Handedness::Left => self.left,
        }
    }
}

/// One record per destination port, right hand first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Routes([(u16, Landmarks); 2]);

impl Routes {
    fn new(destinations: &Destinations) -> Self {
        Self([
            (destinations.right, DEFAULT_RECORD),
            (destinations.left, DEFAULT_RECORD),
        ])
    }

    #[cfg(test)]
    pub(crate) fn get(&self, port: u16) -> Option<&Landmarks> {
        self.0
            .iter()
            .find(|(p, _)| *p == port)
            .map(|(_, record)| record)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &(u16, Landmarks)> {
        self.0.iter()
    }

    fn set(&mut self, port: u16, landmarks: Landmarks) {
        if let Some((_, record)) = self.0.iter_mut().find(|(p, _)| *p == port) {
            *record = landmarks;
        }
    }
}

/// Assign each hand's landmarks to its port.
///
/// Ports without a hand carry [`DEFAULT_RECORD`]. If two hands claim the same
/// handedness the later one wins.
pub(crate) fn route<'a, I>(destinations: &Destinations, hands: I) -> Routes
where
    I: IntoIterator<Item = &'a Hand>,
{
    let mut routes = Routes::new(destinations);
    for hand in hands {
        routes.set(destinations.port(hand.handedness), hand.landmarks);
    }
    routes
}
