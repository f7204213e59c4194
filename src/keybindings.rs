//! Global keybindings.

use std::collections::{HashMap, HashSet};

use bitflags::bitflags;
use tracing::debug;

use crate::protocol::{ClientId, ProtocolError, Request};

bitflags! {
    /// Keyboard modifiers, using the X11 modifier mask layout.
    #[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
    pub struct ModifierMask: u32 {
        const SHIFT = 1;
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1 = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const MOD4 = 1 << 6;
        const MOD5 = 1 << 7;
        const ANY = 1 << 15;
    }
}

impl ModifierMask {
    /// Strip modifiers which never affect keybinding matches.
    ///
    /// Caps lock and num lock are ignored.
    pub fn normalize(raw: u32) -> Self {
        Self::from_bits_truncate(raw) - (Self::LOCK | Self::MOD2 | Self::ANY)
    }
}

/// Keybinding registry owned by a single privileged client.
#[derive(Default, Debug)]
pub struct Keybindings {
    bindings: HashMap<u32, HashSet<ModifierMask>>,
    registrant: Option<ClientId>,
}

impl Keybindings {
    /// Claim the keybinding registry.
    pub fn bind(&mut self, client: ClientId) -> Result<(), ProtocolError> {
        if self.registrant.is_some() {
            return Err(ProtocolError::KeybindingsTaken);
        }

        debug!("Keybindings bound by {client:?}");
        self.registrant = Some(client);
        Ok(())
    }

    /// Release the registry if `client` owns it.
    pub fn unbind(&mut self, client: ClientId) {
        if self.registrant == Some(client) {
            debug!("Keybindings released by {client:?}");
            self.registrant = None;
            self.bindings.clear();
        }
    }

    /// Add a keybinding.
    pub fn register(
        &mut self,
        client: ClientId,
        keycode: u32,
        modifiers: u32,
    ) -> Result<(), ProtocolError> {
        self.check_registrant(client)?;

        let modifiers = ModifierMask::normalize(modifiers);
        debug!("Registered keybinding {keycode} with {modifiers:?}");
        self.bindings.entry(keycode).or_default().insert(modifiers);
        Ok(())
    }

    /// Remove all keybindings.
    pub fn clear(&mut self, client: ClientId) -> Result<(), ProtocolError> {
        self.check_registrant(client)?;
        self.bindings.clear();
        Ok(())
    }

    pub fn registrant(&self) -> Option<ClientId> {
        self.registrant
    }

    /// Check if a key combination is bound.
    pub fn matches(&self, keycode: u32, modifiers: ModifierMask) -> bool {
        self.bindings.get(&keycode).map_or(false, |masks| masks.contains(&modifiers))
    }

    /// Offer a key event to the registrant.
    ///
    /// The registrant is notified of every key. Returns `true` if the key
    /// should not be delivered to the focused client.
    pub fn on_key(
        &self,
        keycode: u32,
        modifiers: u32,
        pressed: bool,
        time: u32,
        focused_client: Option<ClientId>,
        requests: &mut Vec<Request>,
    ) -> bool {
        let client = match self.registrant {
            Some(client) => client,
            None => return false,
        };

        let modifiers = ModifierMask::normalize(modifiers);
        requests.push(Request::KeybindingKey {
            modifiers: modifiers.bits(),
            client,
            time,
            keycode,
            pressed,
        });

        self.matches(keycode, modifiers) || focused_client == Some(client)
    }

    fn check_registrant(&self, client: ClientId) -> Result<(), ProtocolError> {
        match self.registrant {
            Some(registrant) if registrant == client => Ok(()),
            _ => Err(ProtocolError::NotRegistrant),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn locks_are_ignored() {
        let mut keybindings = Keybindings::default();
        keybindings.bind(ClientId(1)).unwrap();
        keybindings.register(ClientId(1), 24, ModifierMask::MOD1.bits()).unwrap();

        let mut requests = Vec::new();
        let pressed = (ModifierMask::MOD1 | ModifierMask::LOCK | ModifierMask::MOD2).bits();
        assert!(keybindings.on_key(24, pressed, true, 0, None, &mut requests));
        assert!(!keybindings.on_key(24, ModifierMask::MOD4.bits(), true, 1, None, &mut requests));

        // Registrant is notified even for unbound keys.
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1], Request::KeybindingKey {
            client: ClientId(1),
            time: 1,
            keycode: 24,
            modifiers: ModifierMask::MOD4.bits(),
            pressed: true,
        });
    }

    #[test]
    fn focused_registrant_keeps_keys() {
        let mut keybindings = Keybindings::default();
        keybindings.bind(ClientId(1)).unwrap();

        let mut requests = Vec::new();
        assert!(keybindings.on_key(30, 0, true, 0, Some(ClientId(1)), &mut requests));
        assert!(!keybindings.on_key(30, 0, true, 0, Some(ClientId(2)), &mut requests));
    }

    #[test]
    fn single_registrant() {
        let mut keybindings = Keybindings::default();
        assert_eq!(keybindings.register(ClientId(1), 1, 0), Err(ProtocolError::NotRegistrant));

        keybindings.bind(ClientId(1)).unwrap();
        assert_eq!(keybindings.bind(ClientId(2)), Err(ProtocolError::KeybindingsTaken));
        assert_eq!(keybindings.clear(ClientId(2)), Err(ProtocolError::NotRegistrant));

        keybindings.register(ClientId(1), 1, 0).unwrap();
        keybindings.unbind(ClientId(1));
        assert!(!keybindings.matches(1, ModifierMask::empty()));
        assert_eq!(keybindings.bind(ClientId(2)), Ok(()));
    }

    #[test]
    fn no_registrant_passes_keys() {
        let keybindings = Keybindings::default();
        let mut requests = Vec::new();
        assert!(!keybindings.on_key(30, 0, true, 0, None, &mut requests));
        assert!(requests.is_empty());
    }
}
