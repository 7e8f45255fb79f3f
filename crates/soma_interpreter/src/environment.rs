use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::error::RuntimeError;
use crate::object::Object;

/// One scope of variable bindings, linked to the scope that encloses it.
#[derive(Debug, Default)]
pub struct Environment {
    store: HashMap<String, Rc<Object>>,
    outer: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            store: HashMap::new(),
            outer: None,
        }
    }

    /// Create a new environment that is enclosed by a given outer environment
    pub fn new_enclosed(outer: Rc<RefCell<Environment>>) -> Self {
        Environment {
            store: HashMap::new(),
            outer: Some(outer),
        }
    }

    pub fn get(&self, name: &str) -> Option<Rc<Object>> {
        match self.store.get(name) {
            Some(obj) => Some(Rc::clone(obj)),
            None => match self.outer {
                Some(ref outer) => outer.borrow().get(name),
                None => None,
            },
        }
    }

    /// Bind `name` in this scope, shadowing any outer binding.
    pub fn define(&mut self, name: String, value: Rc<Object>) {
        self.store.insert(name, value);
    }

    /// Rebind the nearest existing `name`, searching outwards.
    pub fn assign(&mut self, name: &str, value: &Rc<Object>) -> Result<(), RuntimeError> {
        if let Some(slot) = self.store.get_mut(name) {
            *slot = Rc::clone(value);
            Ok(())
        } else {
            match self.outer {
                Some(ref outer) => outer.borrow_mut().assign(name, value),
                None => Err(RuntimeError::UndefinedVariable(name.to_owned())),
            }
        }
    }

    /// Assignment semantics of `x = e`: update the nearest binding, or create one here.
    pub fn set(&mut self, name: String, value: Rc<Object>) {
        if self.assign(&name, &value).is_err() {
            self.define(name, value);
        }
    }

    #[cfg(test)]
    fn contains_local(&self, name: &str) -> bool {
        self.store.contains_key(name)
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        match &self.outer {
            Some(parent_env) => 1 + parent_env.borrow().depth(),
            None => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use crate::{environment::Environment, error::RuntimeError, object::Object};

    #[test]
    pub fn test_depth() {
        let env1 = Rc::new(RefCell::new(Environment::new()));
        assert_eq!(env1.borrow().depth(), 1);

        let env2 = Rc::new(RefCell::new(Environment::new_enclosed(Rc::clone(&env1))));
        assert_eq!(env1.borrow().depth(), 1);
        assert_eq!(env2.borrow().depth(), 2);

        let env3 = Rc::new(RefCell::new(Environment::new_enclosed(Rc::clone(&env2))));
        assert_eq!(env2.borrow().depth(), 2);
        assert_eq!(env3.borrow().depth(), 3);
    }

    #[test]
    fn test_set_updates_nearest_binding() {
        let global = Rc::new(RefCell::new(Environment::new()));
        global
            .borrow_mut()
            .define("x".into(), Rc::new(Object::Integer(1)));

        let mut inner = Environment::new_enclosed(Rc::clone(&global));
        inner.set("x".into(), Rc::new(Object::Integer(2)));
        inner.set("y".into(), Rc::new(Object::Integer(3)));

        assert!(!inner.contains_local("x"));
        assert!(inner.contains_local("y"));
        assert_eq!(global.borrow().get("x"), Some(Rc::new(Object::Integer(2))));
        assert_eq!(global.borrow().get("y"), None);
    }

    #[test]
    fn test_define_shadows() {
        let global = Rc::new(RefCell::new(Environment::new()));
        global
            .borrow_mut()
            .define("x".into(), Rc::new(Object::Integer(1)));

        let mut inner = Environment::new_enclosed(Rc::clone(&global));
        inner.define("x".into(), Rc::new(Object::Integer(5)));

        assert_eq!(inner.get("x"), Some(Rc::new(Object::Integer(5))));
        assert_eq!(global.borrow().get("x"), Some(Rc::new(Object::Integer(1))));
    }

    #[test]
    fn test_assign_missing() {
        let mut env = Environment::new();
        assert_eq!(
            env.assign("nope", &Rc::new(Object::Nil)),
            Err(RuntimeError::UndefinedVariable("nope".into()))
        );
    }
}
