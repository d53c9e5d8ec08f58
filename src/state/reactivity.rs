// ============================================================================
// REACTIVITY - Sistema de notificaciones/subscribers para reactividad
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub type SubscriptionId = u32;

type Callback<T> = Rc<dyn Fn(&T)>;

/// Estado observable: cada mutación notifica una copia del valor nuevo
///
/// Los subscribers se invocan sin ningún borrow activo, así que pueden
/// volver a leer o modificar el estado desde el callback.
pub struct Observable<T: Clone> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<(SubscriptionId, Callback<T>)>>,
    next_id: Cell<SubscriptionId>,
}

impl<T: Clone> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    /// Copia del valor actual
    pub fn snapshot(&self) -> T {
        self.value.borrow().clone()
    }

    /// Lectura sin copiar
    pub fn with<R>(&self, reader: impl FnOnce(&T) -> R) -> R {
        reader(&self.value.borrow())
    }

    /// Establecer nuevo valor y notificar subscribers
    pub fn set(&self, new_value: T) {
        *self.value.borrow_mut() = new_value;
        self.notify();
    }

    /// Actualizar valor usando closure y notificar
    pub fn update<R>(&self, updater: impl FnOnce(&mut T) -> R) -> R {
        let result = updater(&mut self.value.borrow_mut());
        self.notify();
        result
    }

    /// Suscribirse a cambios
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.subscribers.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Notificar a todos los subscribers
    fn notify(&self) {
        let snapshot = self.snapshot();
        let callbacks: Vec<Callback<T>> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_new_value() {
        let observable = Observable::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            observable.subscribe(move |v| seen.borrow_mut().push(*v));
        }

        observable.set(1);
        observable.update(|v| *v += 10);
        assert_eq!(*seen.borrow(), vec![1, 11]);
    }

    #[test]
    fn test_unsubscribe() {
        let observable = Observable::new(0);
        let calls = Rc::new(Cell::new(0));
        let id = {
            let calls = calls.clone();
            observable.subscribe(move |_| calls.set(calls.get() + 1))
        };

        assert!(observable.unsubscribe(id));
        assert!(!observable.unsubscribe(id));
        observable.set(5);
        assert_eq!(calls.get(), 0);
        assert_eq!(observable.subscriber_count(), 0);
    }

    #[test]
    fn test_subscriber_can_reenter() {
        let observable = Rc::new(Observable::new(0));
        {
            let inner = observable.clone();
            observable.subscribe(move |v| {
                if *v == 1 {
                    inner.set(2);
                }
            });
        }

        observable.set(1);
        assert_eq!(observable.snapshot(), 2);
    }
}
