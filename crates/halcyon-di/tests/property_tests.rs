//! Property-based tests for injector resolution
//!
//! 1. Singleton identity - repeated resolution yields the same instance
//! 2. Chain resolution - an acyclic chain of any length within the limit resolves
//! 3. Cycle detection - every cycle length is detected and leaves no residue

use halcyon_di::{DiError, Injector, Provider, Token};
use proptest::prelude::*;
use std::rc::Rc;

fn chain(length: usize, close_cycle: bool, limit: usize) -> (Injector, Vec<Token<usize>>) {
	let tokens: Vec<Token<usize>> = (0..length).map(|_| Token::new("link")).collect();
	let providers = tokens.iter().enumerate().map(|(index, token)| {
		let next = if index + 1 < length {
			Some(tokens[index + 1].clone())
		} else if close_cycle {
			Some(tokens[0].clone())
		} else {
			None
		};
		match next {
			Some(next) => Provider::factory(token, [next.erased()], move |deps| {
				Ok(*deps.get(&next)? + 1)
			}),
			None => Provider::factory(token, [], |_| Ok(1)),
		}
	});
	let injector = Injector::builder()
		.max_resolution_depth(limit)
		.providers(providers.collect::<Vec<_>>())
		.build();
	(injector, tokens)
}

proptest! {
	#[test]
	fn prop_singleton_identity(resolutions in 2usize..20) {
		let token: Token<String> = Token::new("shared");
		let injector = Injector::new([Provider::factory(&token, [], |_| Ok("x".to_string()))]);

		let first = injector.get(&token, None).unwrap();
		for _ in 1..resolutions {
			let next = injector.get(&token, None).unwrap();
			prop_assert!(Rc::ptr_eq(&first, &next));
		}
	}

	#[test]
	fn prop_acyclic_chain_resolves(length in 1usize..40) {
		let (injector, tokens) = chain(length, false, 100);

		let head = injector.get(&tokens[0], None).unwrap();

		prop_assert_eq!(*head, length);
	}

	#[test]
	fn prop_cycles_are_detected(length in 1usize..30) {
		let (injector, tokens) = chain(length, true, 100);

		for token in &tokens {
			let err = injector.get(token, None).unwrap_err();
			let is_cycle = matches!(err, DiError::CircularDependency { .. });
			prop_assert!(is_cycle);
		}
	}
}
